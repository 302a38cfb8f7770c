use anyhow::Result;
use clap::{Parser, Subcommand};
use reelfeed::{ingester, settings::Settings, stream};
use tracing_subscriber::EnvFilter;

#[doc(hidden)]
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long)]
    config: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one bounded produce window (invoked by the scheduler)
    Stream,
    /// Run the long-lived topic-to-scylla ingester
    Ingest,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let settings = Settings::new(&args.config)?;
    match args.command {
        Command::Stream => stream::run_stream(&settings).await,
        Command::Ingest => ingester::run_ingest(&settings).await,
    }
}
