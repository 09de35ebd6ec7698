//! Model persistence
//!
//! A trained model is the fitted forest together with the feature schema it
//! was trained on and some provenance metadata. It is stored in aprender's
//! `.apr` container (`ModelType::Custom`, zstd-compressed by default) so a
//! deployment can load it without retraining.
//!
//! Carrying the schema inside the artifact is what lets inference refuse a
//! four-column row for a five-column model instead of silently scoring it.

use crate::error::DetectorError;
use crate::schema::{FeatureRow, FeatureSchema};
use aprender::primitives::Matrix;
use aprender::tree::RandomForestClassifier;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during model persistence operations
#[derive(Error, Debug)]
pub enum ModelPersistenceError {
    #[error("Failed to save model: {0}")]
    SaveError(String),

    #[error("Failed to load model: {0}")]
    LoadError(String),

    #[error("Model file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid model format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for model persistence operations
pub type Result<T> = std::result::Result<T, ModelPersistenceError>;

/// Metadata for a persisted model
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelMetadata {
    /// phishguard version that created this model
    pub phishguard_version: String,
    /// Seconds since the Unix epoch when the model was trained
    pub trained_at: String,
    /// Number of samples used for training
    pub training_samples: usize,
    /// Accuracy on the held-out partition
    pub accuracy: Option<f64>,
    /// SHA-256 of the feature table the model was trained on
    pub feature_table_sha256: Option<String>,
    /// Model-specific hyperparameters
    pub hyperparameters: HashMap<String, String>,
    /// Optional description
    pub description: Option<String>,
}

impl ModelMetadata {
    /// Create new metadata with current timestamp
    pub fn new(training_samples: usize) -> Self {
        Self {
            phishguard_version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: chrono_lite_timestamp(),
            training_samples,
            accuracy: None,
            feature_table_sha256: None,
            hyperparameters: HashMap::new(),
            description: None,
        }
    }

    /// Add a hyperparameter
    pub fn with_hyperparameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.hyperparameters.insert(key.into(), value.into());
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn with_feature_table_sha256(mut self, digest: impl Into<String>) -> Self {
        self.feature_table_sha256 = Some(digest.into());
        self
    }

    /// Add a description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

/// Lightweight timestamp without chrono dependency
fn chrono_lite_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", duration.as_secs())
}

/// Pack equal-width feature rows into the row-major matrix aprender fits on
pub fn feature_matrix(rows: &[Vec<f32>], width: usize) -> std::result::Result<Matrix<f32>, DetectorError> {
    let mut data = Vec::with_capacity(rows.len() * width);
    for row in rows {
        if row.len() != width {
            return Err(DetectorError::Training(format!(
                "row has {} values, expected {}",
                row.len(),
                width
            )));
        }
        data.extend_from_slice(row);
    }
    Matrix::from_vec(rows.len(), width, data).map_err(|e| DetectorError::Training(e.to_string()))
}

/// Phishing probability per row, from the forest's vote proportions
pub fn phishing_probabilities(forest: &RandomForestClassifier, x: &Matrix<f32>) -> Vec<f64> {
    let proba = forest.predict_proba(x);
    let (rows, classes) = proba.shape();
    (0..rows)
        .map(|i| if classes > 1 { f64::from(proba.get(i, 1)) } else { 0.0 })
        .collect()
}

/// Class for a phishing probability; an even vote counts as safe
pub fn class_for(probability: f64) -> usize {
    usize::from(probability > 0.5)
}

/// Fitted classifier plus the schema it expects
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TrainedModel {
    pub schema: FeatureSchema,
    pub forest: RandomForestClassifier,
    /// Trees in the forest
    pub n_estimators: usize,
    /// Width of the rows the forest was fitted on
    pub n_features: usize,
    pub metadata: ModelMetadata,
}

impl TrainedModel {
    pub fn new(
        schema: FeatureSchema,
        forest: RandomForestClassifier,
        n_estimators: usize,
        metadata: ModelMetadata,
    ) -> Self {
        Self {
            n_features: schema.len(),
            schema,
            forest,
            n_estimators,
            metadata,
        }
    }

    /// Verify that a row was projected with this model's schema
    pub fn check_schema(&self, row: &FeatureRow) -> std::result::Result<(), DetectorError> {
        if row.schema != self.schema || row.values.len() != self.n_features {
            return Err(DetectorError::FeatureSchemaMismatch {
                expected: self.schema.to_string(),
                found: format!("{} with {} values", row.schema, row.values.len()),
            });
        }
        Ok(())
    }

    /// Predicted class and phishing probability for a schema-checked row
    pub fn predict_row(&self, row: &FeatureRow) -> std::result::Result<(usize, Option<f64>), DetectorError> {
        self.check_schema(row)?;
        let x = feature_matrix(std::slice::from_ref(&row.values), self.n_features)?;
        let probability = phishing_probabilities(&self.forest, &x).first().copied();
        let class = probability.map(class_for).unwrap_or(0);
        Ok((class, probability))
    }

    /// Whether the forest produces a proper vote distribution
    fn is_fitted(&self) -> bool {
        let Ok(x) = feature_matrix(&[vec![0.0; self.n_features]], self.n_features) else {
            return false;
        };
        let proba = self.forest.predict_proba(&x);
        let (_, classes) = proba.shape();
        let total: f32 = (0..classes).map(|c| proba.get(0, c)).sum();
        self.n_estimators > 0 && (total - 1.0).abs() < 1e-3
    }
}

/// Options for saving models
#[derive(Debug, Clone)]
pub struct PersistenceOptions {
    /// Enable compression (default: true)
    pub compress: bool,
    /// Model name
    pub name: Option<String>,
    /// Model description
    pub description: Option<String>,
}

impl Default for PersistenceOptions {
    fn default() -> Self {
        Self {
            compress: true,
            name: None,
            description: None,
        }
    }
}

impl PersistenceOptions {
    /// Create new options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set compression
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Set model name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set model description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

/// Save a trained model to .apr format, creating parent directories
pub fn save_model(
    model: &TrainedModel,
    path: impl AsRef<Path>,
    options: PersistenceOptions,
) -> Result<()> {
    use aprender::format::{save, Compression, ModelType, SaveOptions};

    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let compression = if options.compress {
        Compression::ZstdDefault
    } else {
        Compression::None
    };

    let mut save_options = SaveOptions::new().with_compression(compression);

    if let Some(name) = options.name {
        save_options = save_options.with_name(name);
    }
    if let Some(desc) = options.description {
        save_options = save_options.with_description(desc);
    }

    save(model, ModelType::Custom, path.as_ref(), save_options)
        .map_err(|e| ModelPersistenceError::SaveError(e.to_string()))
}

/// Load a trained model from .apr format
pub fn load_model(path: impl AsRef<Path>) -> Result<TrainedModel> {
    use aprender::format::{load, ModelType};

    if !path.as_ref().exists() {
        return Err(ModelPersistenceError::FileNotFound(
            path.as_ref().display().to_string(),
        ));
    }

    let model = load::<TrainedModel>(path.as_ref(), ModelType::Custom)
        .map_err(|e| ModelPersistenceError::LoadError(e.to_string()))?;

    if FeatureSchema::by_version(model.schema.version).as_ref() != Some(&model.schema) {
        return Err(ModelPersistenceError::InvalidFormat(format!(
            "unknown feature schema {}",
            model.schema
        )));
    }
    if model.n_features != model.schema.len() || !model.is_fitted() {
        return Err(ModelPersistenceError::InvalidFormat(format!(
            "forest expects {} features but schema has {}",
            model.n_features,
            model.schema.len()
        )));
    }

    Ok(model)
}

/// Check if a model file exists and is valid
pub fn validate_model_file(path: impl AsRef<Path>) -> Result<ModelMetadata> {
    load_model(path).map(|model| model.metadata)
}

/// Generate a status line for model information
pub fn model_status_line(model: &TrainedModel) -> String {
    let metadata = &model.metadata;
    let accuracy = metadata
        .accuracy
        .map(|a| format!(", accuracy {:.3}", a))
        .unwrap_or_default();
    format!(
        "model: phishguard v{}, {} trees on {}, trained with {} samples{}",
        metadata.phishguard_version,
        model.n_estimators,
        model.schema.name,
        metadata.training_samples,
        accuracy
    )
}

impl ModelPersistenceError {
    /// Map onto the detector error a user sees for `path`
    pub fn into_detector_error(self, path: &Path) -> DetectorError {
        let path = path.display().to_string();
        match self {
            ModelPersistenceError::FileNotFound(p) => {
                DetectorError::ModelUnavailable(format!("no model artifact at {}", p))
            }
            ModelPersistenceError::SaveError(reason) => DetectorError::ModelSave { path, reason },
            ModelPersistenceError::IoError(e) => DetectorError::Io(e),
            ModelPersistenceError::LoadError(reason)
            | ModelPersistenceError::InvalidFormat(reason) => {
                DetectorError::ModelLoad { path, reason }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tiny_model(schema: FeatureSchema) -> TrainedModel {
        let width = schema.len();
        let samples: Vec<Vec<f32>> = (0..20)
            .map(|i| (0..width).map(|j| (i * (j + 1)) as f32).collect())
            .collect();
        let labels: Vec<usize> = (0..20).map(|i| usize::from(i >= 10)).collect();
        let x = feature_matrix(&samples, width).unwrap();
        let mut forest = RandomForestClassifier::new(5).with_random_state(1);
        forest.fit(&x, &labels).unwrap();
        TrainedModel::new(schema, forest, 5, ModelMetadata::new(20))
    }

    #[test]
    fn test_model_metadata_creation() {
        let metadata = ModelMetadata::new(1000);

        assert_eq!(metadata.phishguard_version, env!("CARGO_PKG_VERSION"));
        assert_eq!(metadata.training_samples, 1000);
        assert!(metadata.hyperparameters.is_empty());
        assert!(metadata.description.is_none());
        assert!(metadata.accuracy.is_none());
    }

    #[test]
    fn test_model_metadata_builders() {
        let metadata = ModelMetadata::new(500)
            .with_hyperparameter("n_estimators", "100")
            .with_accuracy(0.93)
            .with_feature_table_sha256("abc123")
            .with_description("Test model");

        assert_eq!(
            metadata.hyperparameters.get("n_estimators"),
            Some(&"100".to_string())
        );
        assert_eq!(metadata.accuracy, Some(0.93));
        assert_eq!(metadata.feature_table_sha256.as_deref(), Some("abc123"));
        assert_eq!(metadata.description, Some("Test model".to_string()));
    }

    #[test]
    fn test_persistence_options_builder() {
        let options = PersistenceOptions::new()
            .with_compression(false)
            .with_name("phishing-model")
            .with_description("Production model");

        assert!(!options.compress);
        assert_eq!(options.name, Some("phishing-model".to_string()));
        assert_eq!(options.description, Some("Production model".to_string()));
        assert!(PersistenceOptions::default().compress);
    }

    #[test]
    fn test_save_and_load_model() {
        let temp_dir = TempDir::new().unwrap();
        let model_path = temp_dir.path().join("models/phishing_model.apr");
        let model = tiny_model(FeatureSchema::lexical_entropy_v2());

        save_model(&model, &model_path, PersistenceOptions::new().with_name("test"))
            .expect("Failed to save model");
        let loaded = load_model(&model_path).expect("Failed to load model");

        assert_eq!(loaded.schema, model.schema);
        assert_eq!(loaded.metadata, model.metadata);
        assert_eq!(loaded.n_estimators, 5);

        let row = model
            .schema
            .project(&crate::features::extract("http://192.168.1.5/login.php"));
        assert_eq!(loaded.predict_row(&row).unwrap(), model.predict_row(&row).unwrap());
    }

    #[test]
    fn test_save_and_load_uncompressed() {
        let temp_dir = TempDir::new().unwrap();
        let model_path = temp_dir.path().join("uncompressed.apr");
        let model = tiny_model(FeatureSchema::lexical_v1());

        save_model(&model, &model_path, PersistenceOptions::new().with_compression(false))
            .expect("Failed to save uncompressed");
        let loaded = load_model(&model_path).expect("Failed to load");
        assert_eq!(loaded.schema.version, 1);
    }

    #[test]
    fn test_load_nonexistent_model() {
        match load_model("/nonexistent/path/model.apr") {
            Err(ModelPersistenceError::FileNotFound(path)) => {
                assert!(path.contains("nonexistent"));
            }
            other => panic!("Expected FileNotFound error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_load_corrupt_model() {
        let temp_dir = TempDir::new().unwrap();
        let model_path = temp_dir.path().join("corrupt.apr");
        std::fs::write(&model_path, b"definitely not a model").unwrap();

        let err = load_model(&model_path).unwrap_err();
        assert!(matches!(err, ModelPersistenceError::LoadError(_)));

        let detector_err = err.into_detector_error(&model_path);
        assert!(matches!(detector_err, DetectorError::ModelLoad { .. }));
    }

    #[test]
    fn test_missing_file_maps_to_unavailable() {
        let err = ModelPersistenceError::FileNotFound("models/x.apr".to_string());
        let mapped = err.into_detector_error(Path::new("models/x.apr"));
        assert!(matches!(mapped, DetectorError::ModelUnavailable(_)));
    }

    #[test]
    fn test_validate_model_file() {
        let temp_dir = TempDir::new().unwrap();
        let model_path = temp_dir.path().join("validate.apr");
        save_model(
            &tiny_model(FeatureSchema::lexical_entropy_v2()),
            &model_path,
            PersistenceOptions::new(),
        )
        .unwrap();

        let metadata = validate_model_file(&model_path).expect("Validation failed");
        assert_eq!(metadata.training_samples, 20);
    }

    #[test]
    fn test_predict_row_checks_schema() {
        let model = tiny_model(FeatureSchema::lexical_entropy_v2());
        let features = crate::features::extract("http://192.168.1.5/login.php");

        let v2_row = FeatureSchema::lexical_entropy_v2().project(&features);
        let (class, proba) = model.predict_row(&v2_row).unwrap();
        assert!(class <= 1);
        assert!(proba.is_some());

        let v1_row = FeatureSchema::lexical_v1().project(&features);
        assert!(matches!(
            model.predict_row(&v1_row),
            Err(DetectorError::FeatureSchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_unfitted_forest_is_rejected_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let model_path = temp_dir.path().join("unfitted.apr");
        let model = TrainedModel::new(
            FeatureSchema::lexical_entropy_v2(),
            RandomForestClassifier::new(5),
            5,
            ModelMetadata::new(0),
        );
        save_model(&model, &model_path, PersistenceOptions::new()).unwrap();

        assert!(matches!(
            load_model(&model_path),
            Err(ModelPersistenceError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_feature_matrix_rejects_ragged_rows() {
        let x = feature_matrix(&[vec![1.0, 2.0], vec![3.0, 4.0]], 2).unwrap();
        assert_eq!(x.shape(), (2, 2));
        assert_eq!(x.get(1, 0), 3.0);

        assert!(matches!(
            feature_matrix(&[vec![1.0, 2.0], vec![3.0]], 2),
            Err(DetectorError::Training(_))
        ));
    }

    #[test]
    fn test_even_vote_is_safe() {
        assert_eq!(class_for(0.5), 0);
        assert_eq!(class_for(0.51), 1);
        assert_eq!(class_for(0.0), 0);
    }

    #[test]
    fn test_model_status_line() {
        let model = tiny_model(FeatureSchema::lexical_entropy_v2());
        let status = model_status_line(&model);

        assert!(status.contains("phishguard"));
        assert!(status.contains("5 trees"));
        assert!(status.contains("20 samples"));
        assert!(status.contains("lexical-entropy-v2"));
    }
}
