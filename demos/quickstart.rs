//! Quickstart: builds the adapter from DATABASE_TYPE / DB_PATH / POSTGRES_* and writes a few records.
//!
//! Run with `DATABASE_TYPE=sqlite DB_PATH=./data/demo.db cargo run --example quickstart`.

use dynamic_table_sdk::{AdapterFactory, AppState, Filter, FindOptions, Sort};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dynamic_table_sdk=info".parse()?))
        .init();

    let state = AppState::from_env(AdapterFactory::global()).await?;
    let manager = &state.manager;

    for (name, price) in [("Widget", 9.99), ("Gadget", 24.5), ("Doohickey", 3.0)] {
        let data = json!({ "name": name, "price": price, "inStock": true });
        if let Some(obj) = data.as_object() {
            let created = manager.create("Product", obj.clone()).await?;
            tracing::info!(id = ?created.get("id"), name, "created product");
        }
    }

    let opts = FindOptions::new()
        .filter(Filter::new().gt("price", 5))
        .sort(Sort::parse("-price")?);
    for product in manager.find_all("Product", &opts).await? {
        println!("{}", serde_json::to_string(&product)?);
    }

    let total = manager.count("Product", &Filter::new()).await?;
    tracing::info!(total, "products stored");

    AdapterFactory::global().reset_adapter().await?;
    Ok(())
}
