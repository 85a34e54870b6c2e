//! Watch a Dart project and print highlights and diagnostics as they arrive.
//!
//! ```text
//! DART_SDK=/opt/dart-sdk \
//! DART_ANALYSIS_SERVER=/opt/dart-sdk/bin/snapshots/analysis_server.dart.snapshot \
//! RUST_LOG=dartanalysis=debug \
//! cargo run --example watch_highlights -- /path/to/project
//! ```

use anyhow::Context;
use dartanalysis::protocol::AnalysisSubscription;
use dartanalysis::{AnalysisService, ServiceConfig};
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let project = std::env::args()
        .nth(1)
        .context("usage: watch_highlights <project folder>")?;
    let project = std::fs::canonicalize(&project)
        .with_context(|| format!("project folder {} not found", project))?
        .to_string_lossy()
        .into_owned();

    let config = ServiceConfig::from_env()?.inherit_env(true);
    let service = AnalysisService::launch(config)?;

    let mut highlights = service.analysis_highlights();
    let mut errors = service.analysis_errors();

    println!("Analysis server {}", service.get_version().await?);
    service.set_analysis_roots([project.as_str()], Vec::<String>::new()).await?;
    service
        .set_subscriptions(&[AnalysisSubscription::Highlights], &[project.as_str()])
        .await?;

    loop {
        tokio::select! {
            Some(item) = highlights.next() => match item {
                Ok(n) => println!("{}: {} highlight regions", n.file, n.regions.len()),
                Err(e) => eprintln!("highlights: {}", e),
            },
            Some(item) = errors.next() => match item {
                Ok(n) => {
                    for error in &n.errors {
                        println!(
                            "{}:{}:{}: {:?} {}",
                            n.file, error.location.start_line, error.location.start_column,
                            error.severity, error.message
                        );
                    }
                }
                Err(e) => eprintln!("errors: {}", e),
            },
            _ = tokio::signal::ctrl_c() => break,
            else => break,
        }
    }

    service.shutdown().await?;
    Ok(())
}
