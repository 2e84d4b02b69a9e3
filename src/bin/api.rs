use assistant_orchestrator::{
    actions::LoggingUiBridge,
    api,
    engine::ChatEngine,
    explain::ExplainRegistry,
    snapshot::MemoryStateReader,
    Config,
};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env();
    let engine = Arc::new(Mutex::new(ChatEngine::new(
        &config,
        Arc::new(MemoryStateReader::new()),
        Arc::new(LoggingUiBridge),
    )));

    // Explain clicks flow: registry sink -> channel -> engine turn.
    let registry = Arc::new(std::sync::Mutex::new(ExplainRegistry::new()));
    let (tx, mut rx) = mpsc::unbounded_channel();
    registry
        .lock()
        .expect("explain registry poisoned")
        .set_sink(move |prompt| {
            let _ = tx.send(prompt);
        });

    let engine_for_clicks = engine.clone();
    tokio::spawn(async move {
        while let Some(prompt) = rx.recv().await {
            let mut engine = engine_for_clicks.lock().await;
            engine
                .explain_element(&prompt.description, Some(prompt.data))
                .await;
        }
    });

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8090);

    info!(port, "starting assistant API server");
    api::start_server(engine, registry, port).await
}
