//! Streams a drafting task: reasoning to stderr, the letter to stdout.
//! Configure via `JOBMATE_MODEL` (required), `JOBMATE_API_BASE`, `JOBMATE_API_KEY`.

use std::io::{self, Write};
use std::sync::Arc;

use jobmate_engine::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), EngineError> {
    init_logging();

    let transport = HttpTransport::new(EndpointConfig::from_env()?)?;
    let runner = TaskRunner::new(Arc::new(transport), RunnerConfig::default());

    let task = TaskConfig::new(
        "Draft a short, specific cover letter. Be concrete and skip filler.",
    )
    .context_field("job")
    .context_field("profile");

    let mut callbacks = DeltaCallbacks::new(
        |text: &str| eprint!("{text}"),
        |text: &str| {
            print!("{text}");
            let _ = io::stdout().flush();
        },
    );

    let result = runner
        .task(&task)
        .context(
            "job",
            "Senior Rust engineer on the backend platform team at Acme; owns the ingest pipeline.",
        )
        .context(
            "profile",
            "Six years of Rust, streaming systems background, maintains two parser crates.",
        )
        .run(&mut callbacks)
        .await?;

    println!();
    eprintln!(
        "status: {:?}, time to first token: {:?}, time to first content: {:?}",
        result.status, result.timing.time_to_first_token, result.timing.time_to_first_content
    );
    Ok(())
}
