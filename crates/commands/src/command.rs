/// A request to change state, handled once by a [`CommandHandler`](crate::CommandHandler).
///
/// Commands are plain owned data (`Clone + Send + Sync + 'static`) so they can
/// be logged, retried or moved across tasks.
///
/// ## Transactional commands
///
/// A command opts into the transactional pipeline by setting
/// [`TRANSACTIONAL`](Command::TRANSACTIONAL) to `true`. The pipeline then
/// brackets the handler with begin/save/commit and rolls back on failure.
/// Commands that leave the default run unwrapped.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    const TRANSACTIONAL: bool = false;
}
