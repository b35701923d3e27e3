//! Sample entity catalog.
//!
//! These types exist so the registry, units of work and tests have concrete
//! records to persist. The persistence core never looks at their business
//! fields beyond what each `Entity::schema()` declares.

pub mod customer;
pub mod product;
pub mod sales_order;

pub use customer::Customer;
pub use product::Product;
pub use sales_order::{Address, OrderLine, OrderStatus, SalesOrder};
