use assistant_orchestrator::{
    actions::LoggingUiBridge,
    engine::ChatEngine,
    snapshot::{MemoryStateReader, KEY_FEASIBILITY},
    Config,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("Assistant Orchestrator starting");

    let config = Config::from_env();

    // A small in-memory app state stands in for the host UI's storage.
    let mut reader = MemoryStateReader::new();
    reader.set_record(
        KEY_FEASIBILITY,
        r#"[{"idea": "Mobile coffee cart", "verdict": "viable", "score": 74}]"#,
    );
    reader.set_visible_text("Quarterly revenue: $48,200. Compliance score: 87%.");

    let mut engine = ChatEngine::new(&config, Arc::new(reader), Arc::new(LoggingUiBridge));

    // Simulate the user landing on the tax dashboard and asking a question.
    engine.notify_route_change("/tax-compliance");

    let question = "What does this compliance score mean?";
    info!(%question, "running demo turn");

    match engine.send_message(question, None).await {
        Some(reply) => {
            println!("\n=== CONVERSATION ({}) ===", engine.sessions().active_topic());
            for msg in engine.sessions().messages(engine.sessions().active_topic()) {
                println!("[{:?}] {}", msg.role, msg.content);
            }
            if let Some(tools) = &reply.tools {
                println!("Referenced tools: {:?}", tools);
            }
            Ok(())
        }
        None => {
            eprintln!("Turn produced no reply (empty input)");
            Ok(())
        }
    }
}
