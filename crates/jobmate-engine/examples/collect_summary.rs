//! Runs a raw-message summary and prints the collected result with usage.
//! Configure via `JOBMATE_MODEL` (required), `JOBMATE_API_BASE`, `JOBMATE_API_KEY`.

use std::sync::Arc;

use jobmate_engine::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), EngineError> {
    init_logging();

    let transport = HttpTransport::new(EndpointConfig::from_env()?)?;
    let runner = TaskRunner::new(Arc::new(transport), RunnerConfig::default());

    let result = runner
        .messages(vec![
            ChatMessage::system("You summarize job postings in three short bullets."),
            ChatMessage::user(
                "Senior Rust engineer: own the ingest pipeline, mentor two juniors, \
                 hybrid Berlin, Kafka and Postgres stack.",
            ),
        ])
        .collect()
        .await?;

    if result.has_reasoning() {
        eprintln!("-- reasoning --\n{}\n--", result.reasoning);
    }
    println!("{}", result.content);
    eprintln!(
        "tokens: prompt {:?}, completion {:?}",
        result.usage.prompt_tokens, result.usage.completion_tokens
    );
    Ok(())
}
