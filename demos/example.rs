use std::sync::Arc;

use auth_gateway::{AuthGateway, Config, FileStore, LogNavigator, RequestOptions};
use serde_json::Value;
use tracing::warn;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let store = FileStore::open(".auth-gateway-credentials.json")?;
    let gateway = AuthGateway::new(&config, Arc::new(store), Arc::new(LogNavigator))?;

    if let Err(err) = gateway.refresh_if_expiring().await {
        warn!("proactive refresh failed: {}", err);
    }
    let tickets: Value = gateway
        .get("/tickets", RequestOptions::new().query("limit", "20"))
        .await?;
    println!("{}", serde_json::to_string_pretty(&tickets)?);
    Ok(())
}
