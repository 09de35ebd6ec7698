//! Training driver
//!
//! Shapes a feature table into the columns of a schema, holds out 20% of the
//! rows, fits the forest on the rest, and reports held-out accuracy. The
//! fitted forest is bundled with its schema into a [`TrainedModel`].

use crate::dataset::{read_feature_table, train_test_split, FeatureTable};
use crate::error::{DetectorError, Result};
use crate::model_persistence::{
    class_for, feature_matrix, phishing_probabilities, save_model, ModelMetadata,
    PersistenceOptions, TrainedModel,
};
use crate::schema::FeatureSchema;
use aprender::metrics::classification::accuracy;
use aprender::tree::RandomForestClassifier;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Fraction of rows held out for evaluation
pub const TEST_FRACTION: f64 = 0.2;

/// Trees in a default forest
pub const DEFAULT_N_ESTIMATORS: usize = 100;

/// Seed for the split and the bootstrap samples
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone)]
pub struct TrainingOptions {
    pub schema: FeatureSchema,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    /// Seed for both the split and the forest
    pub seed: u64,
    pub test_fraction: f64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            schema: FeatureSchema::canonical(),
            n_estimators: DEFAULT_N_ESTIMATORS,
            max_depth: None,
            seed: DEFAULT_SEED,
            test_fraction: TEST_FRACTION,
        }
    }
}

/// Outcome of a training run
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TrainingReport {
    pub train_rows: usize,
    pub test_rows: usize,
    /// Held-out accuracy; `None` when the test partition is empty
    pub accuracy: Option<f64>,
    pub schema: String,
}

/// Fit a model on an in-memory feature table
pub fn train(table: &FeatureTable, options: &TrainingOptions) -> Result<(TrainedModel, TrainingReport)> {
    let (features, labels) = table.select(&options.schema)?;
    if features.is_empty() {
        return Err(DetectorError::Training("feature table has no rows".to_string()));
    }

    let rows: Vec<(Vec<f32>, usize)> = features.into_iter().zip(labels).collect();
    let (train_rows, test_rows) = train_test_split(&rows, options.test_fraction, options.seed);
    let (x_train, y_train): (Vec<Vec<f32>>, Vec<usize>) = train_rows.into_iter().unzip();
    let (x_test, y_test): (Vec<Vec<f32>>, Vec<usize>) = test_rows.into_iter().unzip();

    if x_train.is_empty() {
        return Err(DetectorError::Training(
            "training partition is empty".to_string(),
        ));
    }
    if !y_train.contains(&0) || !y_train.contains(&1) {
        return Err(DetectorError::Training(
            "training partition needs both legitimate and phishing rows".to_string(),
        ));
    }

    let width = options.schema.len();
    let mut forest =
        RandomForestClassifier::new(options.n_estimators).with_random_state(options.seed);
    if let Some(depth) = options.max_depth {
        forest = forest.with_max_depth(depth);
    }
    forest
        .fit(&feature_matrix(&x_train, width)?, &y_train)
        .map_err(|e| DetectorError::Training(e.to_string()))?;

    let accuracy = if x_test.is_empty() {
        None
    } else {
        let predicted: Vec<usize> =
            phishing_probabilities(&forest, &feature_matrix(&x_test, width)?)
                .into_iter()
                .map(class_for)
                .collect();
        Some(f64::from(accuracy(&predicted, &y_test)))
    };

    let mut metadata = ModelMetadata::new(x_train.len())
        .with_hyperparameter("n_estimators", options.n_estimators.to_string())
        .with_hyperparameter("seed", options.seed.to_string())
        .with_hyperparameter("test_fraction", options.test_fraction.to_string());
    if let Some(depth) = options.max_depth {
        metadata = metadata.with_hyperparameter("max_depth", depth.to_string());
    }
    if let Some(acc) = accuracy {
        metadata = metadata.with_accuracy(acc);
    }

    let report = TrainingReport {
        train_rows: x_train.len(),
        test_rows: x_test.len(),
        accuracy,
        schema: options.schema.name.clone(),
    };
    tracing::info!(
        train_rows = report.train_rows,
        test_rows = report.test_rows,
        accuracy = ?report.accuracy,
        "model trained"
    );

    Ok((
        TrainedModel::new(options.schema.clone(), forest, options.n_estimators, metadata),
        report,
    ))
}

/// Read a feature table, train, and save the model artifact
pub fn train_from_file(
    features_path: impl AsRef<Path>,
    model_path: impl AsRef<Path>,
    options: &TrainingOptions,
) -> Result<(TrainedModel, TrainingReport)> {
    let features_path = features_path.as_ref();
    let model_path = model_path.as_ref();

    let table = read_feature_table(features_path)?;
    let digest = file_sha256(features_path)?;
    let (mut model, report) = train(&table, options)?;
    model.metadata = model
        .metadata
        .with_feature_table_sha256(digest)
        .with_description(format!("trained on {}", features_path.display()));

    save_model(
        &model,
        model_path,
        PersistenceOptions::new().with_name("phishing-url-classifier"),
    )
    .map_err(|e| e.into_detector_error(model_path))?;
    tracing::info!(path = %model_path.display(), "saved model");

    Ok((model, report))
}

fn file_sha256(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| DetectorError::dataset_read(path, e.to_string()))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}
