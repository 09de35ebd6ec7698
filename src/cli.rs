//! CLI argument parsing for phishguard

use crate::schema::FeatureSchema;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for predictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "phishguard")]
#[command(version)]
#[command(about = "Lexical phishing URL classifier with a synthetic training pipeline", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    /// TOML configuration file overriding default paths
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Synthesize a labelled URL dataset
    Generate {
        /// Total number of records
        #[arg(long, default_value_t = 5000)]
        count: usize,

        /// Fraction of records that are phishing (0.0 to 1.0)
        #[arg(long, default_value_t = 0.5)]
        ratio: f64,

        #[arg(long)]
        seed: Option<u64>,

        /// Output CSV (default: data/phishing_dataset.csv)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Split a dataset into train and test files
    Preprocess {
        #[arg(short, long, value_name = "PATH")]
        input: Option<PathBuf>,

        #[arg(long, value_name = "PATH")]
        train_output: Option<PathBuf>,

        #[arg(long, value_name = "PATH")]
        test_output: Option<PathBuf>,

        /// Fraction of rows written to the test file
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Compute the feature table for a labelled dataset
    Extract {
        /// Input CSV (default: data/processed/train.csv)
        #[arg(short, long, value_name = "PATH")]
        input: Option<PathBuf>,

        /// Output CSV (default: data/processed/features.csv)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Feature schema (v1 or v2)
        #[arg(long, default_value = "v2", value_parser = parse_schema)]
        schema: FeatureSchema,
    },

    /// Train the random forest and save the model
    Train {
        /// Feature table CSV (default: data/processed/features.csv)
        #[arg(long, value_name = "PATH")]
        features: Option<PathBuf>,

        /// Model artifact (default: models/phishing_model.apr)
        #[arg(long, value_name = "PATH")]
        model: Option<PathBuf>,

        #[arg(long, default_value = "v2", value_parser = parse_schema)]
        schema: FeatureSchema,

        /// Number of trees
        #[arg(long, default_value_t = 100)]
        trees: usize,

        /// Maximum tree depth (unbounded if omitted)
        #[arg(long)]
        max_depth: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Classify a URL as Phishing or Safe
    Predict {
        /// URL to classify (read from stdin if omitted)
        url: Option<String>,

        #[arg(long, value_name = "PATH")]
        model: Option<PathBuf>,

        /// Project features through this schema instead of the model's own
        #[arg(long, value_parser = parse_schema)]
        schema: Option<FeatureSchema>,

        /// Also print the phishing probability and extracted features
        #[arg(long)]
        details: bool,

        #[arg(long = "format", value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show metadata of a saved model
    Info {
        #[arg(long, value_name = "PATH")]
        model: Option<PathBuf>,
    },
}

fn parse_schema(s: &str) -> Result<FeatureSchema, String> {
    s.parse()
}
