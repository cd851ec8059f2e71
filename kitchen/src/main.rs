use kitchen::{Config, OrderHandler, init_logger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (dotenv, logging)
    dotenv::dotenv().ok();
    init_logger();

    tracing::info!("🍳 Kitchen service starting...");

    // 2. Load configuration
    let config = Config::from_env().map_err(|e| {
        tracing::error!("Fatal error while creating config: {}", e);
        e
    })?;

    // 3. Connect and subscribe (no retry here, the supervisor restarts us)
    let handler = OrderHandler::connect(&config).await.map_err(|e| {
        tracing::error!("Fatal error while connecting to broker: {}", e);
        e
    })?;
    handler.subscribe().await.map_err(|e| {
        tracing::error!("Fatal error while subscribing to orders: {}", e);
        e
    })?;

    // 4. Run until ctrl-c or connection loss
    let shutdown = handler.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    handler.run().await;

    if let Err(e) = handler.close().await {
        tracing::warn!("Error while closing broker connection: {}", e);
    }

    Ok(())
}
