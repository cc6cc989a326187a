mod commands;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use marketq::config::Config;
use marketq::market::MarketClient;

#[derive(Parser, Debug)]
#[command(name = "marketq")]
#[command(about = "Command line client for the job marketplace API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/marketq/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: commands::Command,
}

/// Log to `<data_dir>/marketq/marketq.log`; stdout is reserved for JSON output.
fn init_logging(config: &Config) -> Result<Option<WorkerGuard>> {
  let Some(dir) = dirs::data_dir().map(|d| d.join("marketq")) else {
    return Ok(None);
  };
  std::fs::create_dir_all(&dir)?;

  let appender = tracing_appender::rolling::never(&dir, "marketq.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);
  let filter = EnvFilter::try_from_env("MARKETQ_LOG")
    .unwrap_or_else(|_| EnvFilter::new(config.app.default_log_filter()));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _guard = init_logging(&config)?;

  let market = MarketClient::new(&config)?;
  commands::run(&market, args.command).await
}
