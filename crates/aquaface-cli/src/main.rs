use anyhow::Result;
use aquaface_core::{QualityScorer, VerifySettings};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::PairInput;
use config::Config;

#[derive(Parser)]
#[command(name = "aquaface", about = "Quality-adaptive face verification CLI")]
struct Cli {
    /// TOML config file (defaults to $AQUAFACE_CONFIG if set)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide whether two face images show the same person
    Verify {
        #[arg(long)]
        image_a: PathBuf,
        #[arg(long)]
        image_b: PathBuf,
        /// Embedding JSON for image A (`null` when no face was found)
        #[arg(long)]
        embedding_a: PathBuf,
        /// Embedding JSON for image B (`null` when no face was found)
        #[arg(long)]
        embedding_b: PathBuf,
        /// Decision threshold in [0, 1]
        #[arg(short, long)]
        threshold: Option<f32>,
        /// Decide on the raw cosine similarity
        #[arg(long)]
        no_quality_weighting: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the quality breakdown of one image
    Quality {
        image: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Compare baseline and quality-weighted scores over labelled pairs
    Evaluate {
        /// JSON array of {image_a, image_b, embedding_a, embedding_b, same}
        manifest: PathBuf,
        #[arg(short, long)]
        threshold: Option<f32>,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "configuration resolved");

    let scorer = QualityScorer::new(config.sharpness_saturation)?;

    match cli.command {
        Commands::Verify {
            image_a,
            image_b,
            embedding_a,
            embedding_b,
            threshold,
            no_quality_weighting,
            json,
        } => {
            let settings = VerifySettings {
                threshold: threshold.unwrap_or(config.threshold),
                use_quality_weighting: config.quality_weighting && !no_quality_weighting,
            };
            commands::verify(
                &scorer,
                PairInput {
                    image: &image_a,
                    embedding: &embedding_a,
                },
                PairInput {
                    image: &image_b,
                    embedding: &embedding_b,
                },
                settings,
                json,
            )?;
        }
        Commands::Quality { image, json } => {
            commands::quality(&scorer, &image, json)?;
        }
        Commands::Evaluate {
            manifest,
            threshold,
            json,
        } => {
            commands::evaluate(
                &scorer,
                &manifest,
                threshold.unwrap_or(config.threshold),
                json,
            )?;
        }
    }

    Ok(())
}
