use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use portfolio_bl::config::AppConfig;
use portfolio_bl::pipeline::run_case_study;
use portfolio_bl::report::format_summary;
use portfolio_bl::report::write_case_study;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Black-Litterman case study of a publicly disclosed portfolio.
#[derive(Parser, Debug)]
#[command(name = "portfolio-bl")]
#[command(version)]
#[command(about = "Run a Black-Litterman public portfolio case study")]
struct Cli {
  /// Case-study key from the configuration file
  #[arg(long)]
  person: String,

  /// Path to the configuration YAML
  #[arg(long, default_value = "configs/case_studies.yaml")]
  config: PathBuf,

  /// Directory for generated outputs
  #[arg(long, default_value = "reports/output")]
  output_dir: PathBuf,

  /// Override the configured confidence in the sample-mean views, in (0, 1]
  #[arg(long)]
  view_confidence: Option<f64>,

  /// Verbosity level
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

impl Cli {
  fn init_logging(&self) -> Result<()> {
    let level = match self.verbose {
      0 => Level::WARN,
      1 => Level::INFO,
      2 => Level::DEBUG,
      _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
      .with_max_level(level)
      .with_target(false)
      .finish();

    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  cli.init_logging()?;

  let config = AppConfig::load(&cli.config)
    .with_context(|| format!("failed to load config {}", cli.config.display()))?;
  let result = run_case_study(&config, &cli.person, cli.view_confidence)
    .with_context(|| format!("case study '{}' failed", cli.person))?;

  let output_dir = cli.output_dir.join(&cli.person);
  write_case_study(&result, &output_dir)
    .with_context(|| format!("failed to write reports to {}", output_dir.display()))?;

  println!("Saved outputs to: {}", output_dir.display());
  println!();
  println!("{}", format_summary(&result.summary));

  Ok(())
}
