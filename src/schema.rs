//! Versioned feature schemas
//!
//! A schema is the ordered list of columns a model was trained on. It is
//! stored inside the model artifact, and every feature row carries the schema
//! it was projected with, so a column-set mismatch between extraction and the
//! loaded model is caught by comparing schemas instead of failing somewhere
//! inside the classifier.

use crate::features::FeatureVector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Value kind of a feature column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Non-negative integer count
    Count,
    /// 0/1 indicator
    Flag,
    /// Non-negative real value
    Real,
}

/// Named, typed feature column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub kind: FieldKind,
}

impl SchemaField {
    fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

/// Ordered, versioned set of feature columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub name: String,
    pub fields: Vec<SchemaField>,
}

impl FeatureSchema {
    /// Four lexical columns, no host entropy
    pub fn lexical_v1() -> Self {
        Self {
            version: 1,
            name: "lexical-v1".to_string(),
            fields: vec![
                SchemaField::new("url_length", FieldKind::Count),
                SchemaField::new("dot_count", FieldKind::Count),
                SchemaField::new("https", FieldKind::Flag),
                SchemaField::new("suspicious_words", FieldKind::Flag),
            ],
        }
    }

    /// Four lexical columns plus host entropy; the canonical schema
    pub fn lexical_entropy_v2() -> Self {
        let mut schema = Self::lexical_v1();
        schema.version = 2;
        schema.name = "lexical-entropy-v2".to_string();
        schema
            .fields
            .push(SchemaField::new("host_entropy", FieldKind::Real));
        schema
    }

    /// Schema used when nothing else is requested
    pub fn canonical() -> Self {
        Self::lexical_entropy_v2()
    }

    /// Look up a known schema by version number
    pub fn by_version(version: u32) -> Option<Self> {
        match version {
            1 => Some(Self::lexical_v1()),
            2 => Some(Self::lexical_entropy_v2()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Project a feature vector onto this schema's columns
    pub fn project(&self, features: &FeatureVector) -> FeatureRow {
        let values = self
            .fields
            .iter()
            .map(|field| features.value(&field.name).unwrap_or(0.0) as f32)
            .collect();
        FeatureRow {
            schema: self.clone(),
            values,
        }
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::canonical()
    }
}

impl fmt::Display for FeatureSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (v{}, {} columns: {})",
            self.name,
            self.version,
            self.fields.len(),
            self.column_names().join(",")
        )
    }
}

impl FromStr for FeatureSchema {
    type Err = String;

    /// Accepts `v1`, `v2`, `1`, `2` or the full schema name
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" | "lexical-v1" => Ok(Self::lexical_v1()),
            "v2" | "2" | "lexical-entropy-v2" => Ok(Self::lexical_entropy_v2()),
            other => Err(format!(
                "unknown feature schema '{}' (expected v1 or v2)",
                other
            )),
        }
    }
}

/// Feature values projected through a specific schema
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub schema: FeatureSchema,
    pub values: Vec<f32>,
}
