//! # docgraph
//!
//! Command-line front end for a property graph stored in a document store.
//!
//! ## Usage
//!
//! ```bash
//! docgraph -D graph.redb add-vertex --id bart
//! docgraph -D graph.redb add-vertex --id homer
//! docgraph -D graph.redb add-edge --from bart --to homer -l "son of"
//! docgraph -D graph.redb neighbors --vertex bart -d out
//! docgraph --config docgraph.toml --json list edges
//! ```

use clap::Parser;
use docgraph::cli::{self, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = Cli::parse();

    // DOCGRAPH_LOG_FORMAT=json enables machine-parseable logs on stderr.
    let log_format = std::env::var("DOCGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let default_filter = if cli.verbose {
        "docgraph=debug,docgraph_core=debug"
    } else {
        "docgraph=info,docgraph_core=warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    match cli::execute(&cli) {
        Ok(report) => println!("{}", cli::render(&report, cli.json)),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
