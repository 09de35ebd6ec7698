//! phishguard - lexical phishing URL classifier
//!
//! This library synthesizes a labelled URL corpus, derives a handful of
//! lexical features from each URL, trains a random forest on them, and
//! classifies new URLs as phishing or safe. The trained model is persisted
//! with its feature schema so that inference can refuse mismatched inputs.

pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod inference;
pub mod model_persistence;
pub mod model_source;
pub mod schema;
pub mod synth;
pub mod training;
