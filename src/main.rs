#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::style)]

use clap::Parser;
use tracing::Level;
use switchyard::TransportProvider;
use switchyard::cli::Args;
use switchyard::loader::load_source;
use switchyard::parser::ParseContext;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let is_verbose = args.verbose;
    tracing_subscriber::fmt()
        .with_max_level(if is_verbose {
            Level::TRACE
        } else {
            Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        tracing::error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let text = load_source(&args.config).await?;

    let provider = TransportProvider::new_default()?;
    let pair = provider.parse_text(&ParseContext::new(), &text)?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&pair)?
    } else {
        serde_json::to_string(&pair)?
    };
    println!("{json}");
    Ok(())
}
