use schedule_reminder::startup;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting schedule reminder service");

    // Load configuration
    let config = startup::load_config().await?;

    // Start the poller and the web server
    startup::start_service(config).await
}
