use anyhow::Context;

use polystore_app::{
    AddProduct, AddProductHandler, ListCustomers, ListCustomersHandler, PlaceOrder,
    PlaceOrderHandler, RegisterCustomer, RegisterCustomerHandler, bootstrap,
};
use polystore_commands::CommandPipeline;
use polystore_core::{CancellationSource, UnitOfWork};
use polystore_domain::SalesOrder;
use polystore_infra::PersistenceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    polystore_observability::init();

    let config = PersistenceConfig::from_env().context("invalid persistence configuration")?;
    let factory = bootstrap(&config)
        .await
        .context("failed to initialize persistence")?;

    let pipeline = CommandPipeline::new();
    let cancellation = CancellationSource::new();
    let mut uow = factory.create_unit_of_work(config.provider, cancellation.token())?;

    let customer = pipeline
        .dispatch(
            &RegisterCustomerHandler,
            RegisterCustomer {
                name: "Ada Lovelace".to_string(),
                email: "ada@example.com".to_string(),
            },
            &mut uow,
        )
        .await?;

    let product = pipeline
        .dispatch(
            &AddProductHandler,
            AddProduct {
                sku: "ENGINE-1".to_string(),
                name: "Analytical Engine".to_string(),
                unit_price: 1843.0,
                stock: 3,
            },
            &mut uow,
        )
        .await?;

    let order_id = pipeline
        .dispatch(
            &PlaceOrderHandler,
            PlaceOrder {
                customer_id: customer,
                lines: vec![(product, 1)],
            },
            &mut uow,
        )
        .await?;

    let customers = pipeline
        .dispatch(&ListCustomersHandler, ListCustomers { active_only: true }, &mut uow)
        .await?;

    let orders = uow.repository::<SalesOrder>()?;
    let round_trip = orders.round_trip();
    let order = orders
        .get_by_id(order_id)
        .await?
        .context("placed order not found")?;

    tracing::info!(
        provider = %config.provider,
        customers = customers.len(),
        order = %order.id,
        total = order.total,
        lines = order.lines.len(),
        lossless = round_trip.is_lossless(),
        "demo run complete"
    );
    Ok(())
}
