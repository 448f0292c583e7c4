/// dbview HTTP Server
///
/// Standalone server that computes database views over JSON for frontend
/// clients.

use dbview::server::{run_server, ServerConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Host and port from environment, with defaults
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(2);
        }
    };

    run_server(&config).await
}
