use anyhow::Result;
use backend::axum_http::http_serve::{self, Repositories};
use backend::config::config_loader;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Backend exited with error: {:#}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("backend")?;

    let dotenvy_env = config_loader::load()?;
    info!(stage = ?dotenvy_env.stage, "ENV has been loaded");

    let repositories = Repositories::from_config(&dotenvy_env)?;

    http_serve::start(Arc::new(dotenvy_env), repositories).await?;

    Ok(())
}
