mod app_config;

use retrain::*;

use app_config::AppConfig;
use clap::{Parser, Subcommand};
use reqwest::Url;
use std::{error::Error, path::PathBuf};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Listen for retrain webhooks and post metrics after each retrain
  Serve {
    /// YAML file with service settings; flags override it
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// URL the metrics are POSTed to
    #[arg(long, value_name = "URL")]
    notify_url: Option<String>,
    #[arg(short, long)]
    port: Option<u16>,
    /// Retrain budget in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
  },
  /// Train once on a dataset file and print the metrics
  Train {
    #[arg(short, long, value_name = "PATH")]
    data: PathBuf,
    #[arg(short, long, value_name = "INT", default_value_t = 20)]
    epochs: usize,
    /// Features per row; each row carries one more value, the target
    #[arg(long, value_name = "INT", default_value_t = model::INPUT_DIMENSION)]
    dimension: usize,
    /// Also POST the metrics to this URL
    #[arg(long, value_name = "URL")]
    notify_url: Option<Url>,
  },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
  utils::init_logging()?;
  let args = Cli::parse();

  match args.command {
    Command::Serve {
      config,
      notify_url,
      port,
      timeout,
    } => {
      let file_config = match config {
        Some(path) => AppConfig::from_file(&path)?,
        None => AppConfig::default(),
      };
      let cli_config = AppConfig {
        notify_url,
        port,
        retrain_timeout_secs: timeout,
        ..AppConfig::default()
      };
      let settings = file_config.merge(cli_config).into_settings()?;
      tracing::info!(
        port = settings.port,
        notify_url = %settings.notifier.url,
        timeout_secs = settings.retrain.timeout.as_secs(),
        "starting retrain notifier"
      );
      let app = subcommands::Server::new(settings);
      app.run().await?;
    }
    Command::Train {
      data,
      epochs,
      dimension,
      notify_url,
    } => {
      let config = ModelConfig {
        input_dimension: dimension,
        epochs,
        ..ModelConfig::default()
      };
      let app = subcommands::Train::new(&data, config, notify_url.map(NotifierConfig::new));
      let metrics = app.run().await?;
      println!("{}", serde_json::to_string_pretty(&metrics)?);
    }
  }
  Ok(())
}
