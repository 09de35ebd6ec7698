//! URL classification against a trained model
//!
//! [`ModelCache`] loads the artifact at most once per process (downloading it
//! first when a URL is configured) and hands out shared handles;
//! [`Predictor`] turns a URL into a [`Prediction`].

use crate::error::{DetectorError, Result};
use crate::features::{extract, FeatureVector};
use crate::model_persistence::{load_model, TrainedModel};
use crate::model_source::ModelSource;
use crate::schema::FeatureSchema;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Classification outcome shown to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Phishing,
    Safe,
}

impl Verdict {
    /// Class 1 is phishing, everything else is safe
    pub fn from_class(class: usize) -> Self {
        if class == 1 {
            Verdict::Phishing
        } else {
            Verdict::Safe
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Phishing => write!(f, "Phishing"),
            Verdict::Safe => write!(f, "Safe"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub url: String,
    pub label: Verdict,
    /// Probability of the phishing class
    pub probability: Option<f64>,
    pub features: FeatureVector,
}

/// Classifies URLs with a loaded model
#[derive(Debug, Clone)]
pub struct Predictor {
    model: Arc<TrainedModel>,
}

impl Predictor {
    pub fn new(model: Arc<TrainedModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    /// Classify a URL using the schema stored in the model
    pub fn predict(&self, url: &str) -> Result<Prediction> {
        let schema = self.model.schema.clone();
        self.predict_with_schema(url, &schema)
    }

    /// Classify a URL, projecting its features through `schema`
    ///
    /// Fails with [`DetectorError::FeatureSchemaMismatch`] if `schema` is not
    /// the one the model was trained with.
    pub fn predict_with_schema(&self, url: &str, schema: &FeatureSchema) -> Result<Prediction> {
        let url = url.trim();
        if url.is_empty() {
            return Err(DetectorError::EmptyInput);
        }

        let features = extract(url);
        let row = schema.project(&features);
        let (class, probability) = self.model.predict_row(&row)?;
        let label = Verdict::from_class(class);
        tracing::debug!(url, %label, ?probability, "classified");

        Ok(Prediction {
            url: url.to_string(),
            label,
            probability,
            features,
        })
    }
}

/// Lazily loaded, process-wide model handle
#[derive(Debug)]
pub struct ModelCache {
    source: ModelSource,
    cell: OnceLock<Arc<TrainedModel>>,
}

impl ModelCache {
    pub fn new(source: ModelSource) -> Self {
        Self {
            source,
            cell: OnceLock::new(),
        }
    }

    pub fn source(&self) -> &ModelSource {
        &self.source
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Return the cached model, loading it on first use
    pub fn get_or_load(&self) -> Result<Arc<TrainedModel>> {
        if let Some(model) = self.cell.get() {
            return Ok(Arc::clone(model));
        }

        let path = self.source.ensure_local()?;
        let model = load_model(path).map_err(|e| e.into_detector_error(path))?;
        tracing::info!(path = %path.display(), schema = %model.schema.name, "loaded model");

        let model = self.cell.get_or_init(|| Arc::new(model));
        Ok(Arc::clone(model))
    }

    pub fn predictor(&self) -> Result<Predictor> {
        self.get_or_load().map(Predictor::new)
    }

    /// Drop the cached handle so the next access reads the artifact again
    pub fn reload(&mut self) {
        self.cell = OnceLock::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::FeatureTable;
    use crate::model_persistence::{save_model, PersistenceOptions};
    use crate::synth::generate_seeded;
    use crate::training::{train, TrainingOptions};
    use std::path::Path;
    use tempfile::TempDir;

    fn trained(schema: FeatureSchema) -> TrainedModel {
        let records = generate_seeded(300, 0.5, 11);
        let table = FeatureTable::from_records(&records, &FeatureSchema::canonical());
        let options = TrainingOptions {
            schema,
            n_estimators: 15,
            ..TrainingOptions::default()
        };
        train(&table, &options).unwrap().0
    }

    fn saved(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("models/phishing_model.apr");
        save_model(&trained(FeatureSchema::canonical()), &path, PersistenceOptions::new()).unwrap();
        path
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(Verdict::Phishing.to_string(), "Phishing");
        assert_eq!(Verdict::Safe.to_string(), "Safe");
        assert_eq!(Verdict::from_class(1), Verdict::Phishing);
        assert_eq!(Verdict::from_class(0), Verdict::Safe);
    }

    #[test]
    fn test_empty_url_rejected() {
        let predictor = Predictor::new(Arc::new(trained(FeatureSchema::canonical())));
        assert!(matches!(predictor.predict(""), Err(DetectorError::EmptyInput)));
        assert!(matches!(predictor.predict("  \t"), Err(DetectorError::EmptyInput)));
    }

    #[test]
    fn test_prediction_carries_features() {
        let predictor = Predictor::new(Arc::new(trained(FeatureSchema::canonical())));
        let prediction = predictor.predict(" http://192.168.1.5/login.php ").unwrap();
        assert_eq!(prediction.url, "http://192.168.1.5/login.php");
        assert_eq!(prediction.features.dot_count, 4);
        let p = prediction.probability.unwrap();
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_schema_mismatch_reported() {
        let predictor = Predictor::new(Arc::new(trained(FeatureSchema::lexical_v1())));
        let err = predictor
            .predict_with_schema("https://example.com", &FeatureSchema::lexical_entropy_v2())
            .unwrap_err();
        assert!(matches!(err, DetectorError::FeatureSchemaMismatch { .. }));

        assert!(predictor
            .predict_with_schema("https://example.com", &FeatureSchema::lexical_v1())
            .is_ok());
    }

    #[test]
    fn test_prediction_serializes() {
        let predictor = Predictor::new(Arc::new(trained(FeatureSchema::canonical())));
        let prediction = predictor.predict("https://www.wikipedia.org/about").unwrap();
        let json = serde_json::to_value(&prediction).unwrap();
        assert!(json["label"] == "Safe" || json["label"] == "Phishing");
        assert_eq!(json["features"]["https"], 1);
    }

    #[test]
    fn test_cache_loads_once() {
        let dir = TempDir::new().unwrap();
        let path = saved(dir.path());
        let cache = ModelCache::new(ModelSource::new(&path));
        assert!(!cache.is_loaded());

        let first = cache.get_or_load().unwrap();
        std::fs::remove_file(&path).unwrap();
        let second = cache.get_or_load().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(cache.is_loaded());
    }

    #[test]
    fn test_reload_reads_again() {
        let dir = TempDir::new().unwrap();
        let path = saved(dir.path());
        let mut cache = ModelCache::new(ModelSource::new(&path));
        cache.get_or_load().unwrap();

        std::fs::remove_file(&path).unwrap();
        cache.reload();
        assert!(!cache.is_loaded());
        assert!(matches!(
            cache.get_or_load(),
            Err(DetectorError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_corrupt_artifact_is_load_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.apr");
        std::fs::write(&path, b"not a model").unwrap();
        let cache = ModelCache::new(ModelSource::new(&path));
        assert!(matches!(
            cache.get_or_load(),
            Err(DetectorError::ModelLoad { .. })
        ));
    }
}
