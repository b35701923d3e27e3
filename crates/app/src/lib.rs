//! Application wiring: backend bootstrap plus the order-entry commands.

pub mod bootstrap;
pub mod orders;

pub use bootstrap::bootstrap;
pub use orders::{
    AddProduct, AddProductHandler, ListCustomers, ListCustomersHandler, OrderError, PlaceOrder,
    PlaceOrderHandler, RegisterCustomer, RegisterCustomerHandler,
};
