use anyhow::{bail, Context, Result};
use clap::Parser;
use phishguard::cli::{Cli, Command, OutputFormat};
use phishguard::config::Config;
use phishguard::dataset::{extract_to_file, preprocess, write_records};
use phishguard::error::DetectorError;
use phishguard::inference::{ModelCache, Prediction};
use phishguard::model_persistence::{load_model, model_status_line};
use phishguard::model_source::ModelSource;
use phishguard::synth::{generate_seeded, Label};
use phishguard::training::{train_from_file, TrainingOptions};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; TRACE everywhere when debugging
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Generate {
            count,
            ratio,
            seed,
            output,
        } => {
            let output = output.unwrap_or_else(|| config.dataset_path.clone());
            let records = generate_seeded(count, ratio, seed.unwrap_or(config.seed));
            write_records(&output, &records)?;
            let phishing = records.iter().filter(|r| r.label == Label::Phishing).count();
            println!(
                "Generated {} URLs ({} legitimate, {} phishing) -> {}",
                records.len(),
                records.len() - phishing,
                phishing,
                output.display()
            );
        }

        Command::Preprocess {
            input,
            train_output,
            test_output,
            test_fraction,
            seed,
        } => {
            let input = input.unwrap_or_else(|| config.dataset_path.clone());
            let train_output = train_output.unwrap_or_else(|| config.train_path.clone());
            let test_output = test_output.unwrap_or_else(|| config.test_path.clone());
            if !(0.0..=1.0).contains(&test_fraction) {
                bail!("--test-fraction must be between 0 and 1, got {}", test_fraction);
            }
            let (train_rows, test_rows) = preprocess(
                &input,
                &train_output,
                &test_output,
                test_fraction,
                seed.unwrap_or(config.seed),
            )?;
            println!(
                "Wrote {} training rows -> {}",
                train_rows,
                train_output.display()
            );
            println!("Wrote {} test rows -> {}", test_rows, test_output.display());
        }

        Command::Extract {
            input,
            output,
            schema,
        } => {
            let input = input.unwrap_or_else(|| config.train_path.clone());
            let output = output.unwrap_or_else(|| config.features_path.clone());
            let table = extract_to_file(&input, &output, &schema)?;
            println!(
                "Extracted {} rows with {} -> {}",
                table.len(),
                schema,
                output.display()
            );
        }

        Command::Train {
            features,
            model,
            schema,
            trees,
            max_depth,
            seed,
        } => {
            let features = features.unwrap_or_else(|| config.features_path.clone());
            let model = model.unwrap_or_else(|| config.model_path.clone());
            if trees == 0 {
                bail!("--trees must be at least 1");
            }
            let options = TrainingOptions {
                schema,
                n_estimators: trees,
                max_depth,
                seed: seed.unwrap_or(config.seed),
                ..TrainingOptions::default()
            };
            let (_, report) = train_from_file(&features, &model, &options)?;
            match report.accuracy {
                Some(accuracy) => println!("Model accuracy: {:.4}", accuracy),
                None => println!("Model accuracy: n/a (empty test partition)"),
            }
            println!(
                "Trained on {} rows, evaluated on {} rows -> {}",
                report.train_rows,
                report.test_rows,
                model.display()
            );
        }

        Command::Predict {
            url,
            model,
            schema,
            details,
            format,
        } => {
            let url = match url {
                Some(url) => url,
                None => prompt_url()?,
            };
            if url.trim().is_empty() {
                return Err(DetectorError::EmptyInput.into());
            }
            let source = model_source(&config, model);
            let cache = ModelCache::new(source);
            let predictor = cache.predictor()?;
            let prediction = match schema {
                Some(schema) => predictor.predict_with_schema(&url, &schema)?,
                None => predictor.predict(&url)?,
            };
            print_prediction(&prediction, details, format)?;
        }

        Command::Info { model } => {
            let path = model.unwrap_or_else(|| config.model_path.clone());
            let trained = load_model(&path).map_err(|e| e.into_detector_error(&path))?;
            println!("{}", model_status_line(&trained));
            println!("schema: {}", trained.schema);
            if let Some(digest) = &trained.metadata.feature_table_sha256 {
                println!("feature table sha256: {}", digest);
            }
            println!("trained at: {}", trained.metadata.trained_at);
        }
    }

    Ok(())
}

fn model_source(config: &Config, model: Option<PathBuf>) -> ModelSource {
    let mut source = ModelSource::from_config(config);
    if let Some(path) = model {
        source.model_path = path;
    }
    source
}

fn prompt_url() -> Result<String> {
    print!("Enter URL: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read URL from stdin")?;
    Ok(line.trim().to_string())
}

fn print_prediction(prediction: &Prediction, details: bool, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(prediction)?);
        }
        OutputFormat::Text => {
            println!("{}", prediction.label);
            if details {
                if let Some(probability) = prediction.probability {
                    println!("probability: {:.4}", probability);
                }
                for (name, value) in prediction.features.entries() {
                    println!("{}: {}", name, value);
                }
            }
        }
    }
    Ok(())
}

