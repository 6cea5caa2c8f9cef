#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

use std::path::PathBuf;

use disaster_alerts::core::config::ConfigManager;

#[tokio::main]
async fn main() {
    // Config dir: first argument, then env, then the working directory
    let config_dir = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DISASTER_ALERTS_CONFIG_DIR").ok())
        .map_or_else(|| PathBuf::from("."), PathBuf::from);

    let settings = ConfigManager::new(config_dir).load();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(settings.log_level.as_str()))
        .init();

    if let Err(e) = disaster_alerts::run(settings).await {
        log::error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}
