use std::error::Error;

use ai_llm_service::telemetry;
use tracing::Level;
use tracing_subscriber::{Layer, filter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from .env file if one is present.
    let dotenv = dotenvy::dotenv();

    let env_filter = telemetry::env_filter_with_level("info,tower_http=info", Level::INFO);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                // Library events are rendered by the telemetry layer below.
                .with_filter(filter::filter_fn(|meta| {
                    !meta.target().starts_with(telemetry::TARGET_PREFIX)
                })),
        )
        .with(telemetry::layer())
        .try_init()?;

    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "loaded environment file"),
        Err(e) if e.not_found() => tracing::debug!("no .env file, using process environment"),
        Err(e) => return Err(e.into()),
    }

    api::start().await?;

    Ok(())
}
