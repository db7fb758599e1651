//! Routing-slip demo
//!
//! Transforms a payload along the stages named in a query string, or groups
//! a list of items and routes every group along a shared slip.
//!
//! ## Usage
//!
//! ```bash
//! # Transform text
//! routeslip-demo transform "payload=hello&routing-slip=uppercase&routing-slip=capitalize"
//!
//! # Same, with cursor positions held in a table
//! routeslip-demo --policy table transform "payload=hello&routing-slip=lowercase"
//!
//! # Group equal items and join each group
//! routeslip-demo group a,b,b,b,c --slip joinStrings
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use routeslip::config::{CursorPolicy, RouteSlipConfig};
use routeslip::context::{parse_transform_query, Itinerary};
use routeslip::dispatch::{Dispatcher, Message};
use routeslip::events::LoggingEventSink;
use routeslip::grouping::{Grouping, StringGrouper};
use routeslip::observability::init_logging;
use routeslip::stages::Payload;

#[derive(Parser)]
#[command(
    name = "routeslip-demo",
    about = "Route payloads along a routing slip"
)]
struct Args {
    /// JSON configuration file
    #[arg(long, env = "ROUTESLIP_CONFIG")]
    config: Option<PathBuf>,

    /// Cursor policy, overriding the configuration
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Embedded,
    Table,
}

impl From<PolicyArg> for CursorPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Embedded => Self::Embedded,
            PolicyArg::Table => Self::Table,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Transform the payload of a query string along its slip
    Transform {
        /// Query such as `payload=hi&routing-slip=uppercase`
        query: String,
    },
    /// Group equal items and route each group along the slip
    Group {
        /// Comma-separated items
        #[arg(value_delimiter = ',')]
        items: Vec<String>,

        /// Stage names every group visits
        #[arg(long, value_delimiter = ',')]
        slip: Vec<String>,
    },
}

fn load_config(args: &Args) -> Result<RouteSlipConfig> {
    let mut config = match &args.config {
        Some(path) => RouteSlipConfig::from_json_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => RouteSlipConfig::default(),
    };
    if let Some(policy) = args.policy {
        config.cursor.policy = policy.into();
    }
    config.validate()?;
    Ok(config)
}

fn render(payload: &Payload) -> String {
    match payload {
        Payload::Text(text) => text.clone(),
        Payload::Items(items) => items.join("\n"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_logging(&config.logging)?;

    let dispatcher = Arc::new(
        Dispatcher::from_config(&config)?.with_event_sink(Arc::new(LoggingEventSink::debug())),
    );
    info!(policy = ?dispatcher.cursor().policy(), "dispatcher ready");

    match args.command {
        Command::Transform { query } => {
            let request = parse_transform_query(&query, &config.slip_param);
            let out = dispatcher
                .dispatch(Message::new(request.itinerary, request.payload))
                .await
                .context("routing failed")?;
            println!("{}", render(&out));
        }
        Command::Group { items, slip } => {
            let grouping = Grouping::new(items, Itinerary::new(slip));
            let merged = StringGrouper::new(dispatcher)
                .group_same(grouping)
                .await
                .context("grouping failed")?;
            println!("{}", merged.join("\n"));
        }
    }

    Ok(())
}
