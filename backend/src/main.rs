use social_backend::api::server::{ServerError, start_server};
use social_backend::config::Config;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    info!("Starting user service on {}", config.bind_addr);

    start_server(&config).await
}
