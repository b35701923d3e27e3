//! Order-entry commands.
//!
//! The write commands are transactional: on the relational provider a failure
//! anywhere in the handler leaves no trace. On document and graph the writes
//! made before the failure stay applied.

use async_trait::async_trait;
use thiserror::Error;

use polystore_commands::{Command, CommandHandler};
use polystore_core::{EntityId, PersistenceError, UnitOfWork};
use polystore_domain::{Customer, OrderLine, Product, SalesOrder};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("customer {0} not found")]
    UnknownCustomer(EntityId),

    #[error("customer {0} is inactive")]
    InactiveCustomer(EntityId),

    #[error("product {0} not found")]
    UnknownProduct(EntityId),

    #[error("product {product} has {available} in stock, {requested} requested")]
    InsufficientStock {
        product: EntityId,
        requested: i64,
        available: i64,
    },

    #[error("order quantity must be positive, got {0}")]
    InvalidQuantity(i64),

    #[error("email {0} is already registered")]
    EmailTaken(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, Clone)]
pub struct RegisterCustomer {
    pub name: String,
    pub email: String,
}

impl Command for RegisterCustomer {
    const TRANSACTIONAL: bool = true;
}

pub struct RegisterCustomerHandler;

#[async_trait]
impl<U: UnitOfWork> CommandHandler<U> for RegisterCustomerHandler {
    type Cmd = RegisterCustomer;
    type Output = EntityId;
    type Error = OrderError;

    async fn handle(&self, command: RegisterCustomer, uow: &mut U) -> Result<EntityId, OrderError> {
        let customers = uow.repository::<Customer>()?;
        let taken = customers
            .find(&|c: &Customer| c.email.eq_ignore_ascii_case(&command.email))
            .await?;
        if !taken.is_empty() {
            return Err(OrderError::EmailTaken(command.email));
        }

        let customer = Customer::new(command.name, command.email);
        customers.add(&customer).await?;
        Ok(customer.id)
    }
}

#[derive(Debug, Clone)]
pub struct AddProduct {
    pub sku: String,
    pub name: String,
    pub unit_price: f64,
    pub stock: i64,
}

impl Command for AddProduct {
    const TRANSACTIONAL: bool = true;
}

pub struct AddProductHandler;

#[async_trait]
impl<U: UnitOfWork> CommandHandler<U> for AddProductHandler {
    type Cmd = AddProduct;
    type Output = EntityId;
    type Error = OrderError;

    async fn handle(&self, command: AddProduct, uow: &mut U) -> Result<EntityId, OrderError> {
        let product = Product::new(command.sku, command.name, command.unit_price).with_stock(command.stock);
        uow.repository::<Product>()?.add(&product).await?;
        Ok(product.id)
    }
}

/// Place an order and reserve stock for every line.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub customer_id: EntityId,
    /// `(product, quantity)` pairs.
    pub lines: Vec<(EntityId, i64)>,
}

impl Command for PlaceOrder {
    const TRANSACTIONAL: bool = true;
}

pub struct PlaceOrderHandler;

#[async_trait]
impl<U: UnitOfWork> CommandHandler<U> for PlaceOrderHandler {
    type Cmd = PlaceOrder;
    type Output = EntityId;
    type Error = OrderError;

    async fn handle(&self, command: PlaceOrder, uow: &mut U) -> Result<EntityId, OrderError> {
        let customers = uow.repository::<Customer>()?;
        let products = uow.repository::<Product>()?;
        let orders = uow.repository::<SalesOrder>()?;

        let customer = customers
            .get_by_id(command.customer_id)
            .await?
            .ok_or(OrderError::UnknownCustomer(command.customer_id))?;
        if !customer.active {
            return Err(OrderError::InactiveCustomer(customer.id));
        }

        let mut lines = Vec::with_capacity(command.lines.len());
        for (product_id, quantity) in command.lines {
            if quantity <= 0 {
                return Err(OrderError::InvalidQuantity(quantity));
            }
            let mut product = products
                .get_by_id(product_id)
                .await?
                .ok_or(OrderError::UnknownProduct(product_id))?;
            if product.stock < quantity {
                return Err(OrderError::InsufficientStock {
                    product: product_id,
                    requested: quantity,
                    available: product.stock,
                });
            }
            product.stock -= quantity;
            products.update(&product).await?;
            lines.push(OrderLine {
                product_id,
                quantity,
                unit_price: product.unit_price,
            });
        }

        let order = SalesOrder::new(customer.id, lines);
        orders.add(&order).await?;
        Ok(order.id)
    }
}

/// Read-only listing; runs without a transaction.
#[derive(Debug, Clone)]
pub struct ListCustomers {
    pub active_only: bool,
}

impl Command for ListCustomers {}

pub struct ListCustomersHandler;

#[async_trait]
impl<U: UnitOfWork> CommandHandler<U> for ListCustomersHandler {
    type Cmd = ListCustomers;
    type Output = Vec<Customer>;
    type Error = OrderError;

    async fn handle(&self, command: ListCustomers, uow: &mut U) -> Result<Vec<Customer>, OrderError> {
        let customers = uow.repository::<Customer>()?;
        let listed = if command.active_only {
            customers.find(&|c: &Customer| c.active).await?
        } else {
            customers.get_all().await?
        };
        Ok(listed)
    }
}
