/// needles - measure loudness of audio files
use clap::{Parser, Subcommand};
use needles_cli::{measure_file, CliConfig, CoefficientReport};
use needles_meter::{design_pre_filter, design_weighting_filter, Mode};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "needles")]
#[command(about = "ITU-R BS.1770 loudness metering", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./needles.toml if present)
    #[arg(short, long, global = true, env = "NEEDLES_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure the loudness of a WAV file
    Measure {
        /// WAV file to measure
        path: PathBuf,
        /// Modes to report (momentary, short-term, integrated)
        #[arg(short, long, value_delimiter = ',')]
        modes: Vec<Mode>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print K-weighting filter coefficients
    Coefficients {
        /// Sample rate in Hz
        #[arg(short, long, default_value_t = 48000.0)]
        sample_rate: f64,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "needles=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Measure { path, modes, json } => {
            let config = CliConfig::load(cli.config.as_deref())?;
            let report = measure_file(&path, &config, &modes)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
        }
        Commands::Coefficients { sample_rate, json } => {
            let report = CoefficientReport {
                sample_rate,
                pre_filter: design_pre_filter(sample_rate)?,
                weighting_filter: design_weighting_filter(sample_rate)?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report);
            }
        }
    }

    Ok(())
}
