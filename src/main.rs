use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use advisor_copilot::app;
use advisor_copilot::external::bigquery::BigQueryWarehouse;
use advisor_copilot::external::gemini::GeminiGenerator;
use advisor_copilot::external::text_generator::TextGenerator;
use advisor_copilot::external::warehouse::Warehouse;
use advisor_copilot::logging::{init_logging, LoggingConfig};
use advisor_copilot::services::aggregation::Aggregator;
use advisor_copilot::services::catalog;
use advisor_copilot::services::insights::InsightGenerator;
use advisor_copilot::state::AppState;

const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 20;
const DEFAULT_PROVIDER_CHAIN: &str = "gemini-1.5-pro,gemini-1.0-pro";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_logging(LoggingConfig::from_env())
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    // The one fatal error class: a malformed catalog aborts startup so it
    // can never surface per-request.
    catalog::validate(catalog::specs()).context("invalid query catalog")?;

    let warehouse: Arc<dyn Warehouse> = Arc::new(
        BigQueryWarehouse::from_env().context("failed to configure warehouse client")?,
    );
    let text_generator: Arc<dyn TextGenerator> = Arc::new(
        GeminiGenerator::from_env().context("failed to configure text generator")?,
    );

    let chain: Vec<String> = std::env::var("PROVIDER_CHAIN")
        .unwrap_or_else(|_| DEFAULT_PROVIDER_CHAIN.to_string())
        .split(',')
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    anyhow::ensure!(!chain.is_empty(), "PROVIDER_CHAIN must name at least one model");

    let query_timeout = Duration::from_secs(env_u64("QUERY_TIMEOUT_SECS", DEFAULT_QUERY_TIMEOUT_SECS));
    let provider_timeout =
        Duration::from_secs(env_u64("PROVIDER_TIMEOUT_SECS", DEFAULT_PROVIDER_TIMEOUT_SECS));

    tracing::info!(
        "provider fallback chain: {:?}, query timeout: {:?}",
        chain,
        query_timeout
    );

    let aggregator = Arc::new(Aggregator::new(
        warehouse,
        InsightGenerator::new(text_generator, chain, provider_timeout),
        query_timeout,
    ));

    let state = AppState { aggregator };
    let app = app::create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🚀 Advisor copilot backend running at http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
