//! Synthetic labeled URL corpus
//!
//! Fabricates legitimate and phishing URLs from fixed catalogues and the five
//! deception patterns in [`pattern`]. All randomness comes from the generator
//! passed in, so the same seed reproduces the same corpus byte for byte.
//!
//! # Example
//!
//! ```
//! use phishguard::synth::{generate_seeded, Label};
//!
//! let records = generate_seeded(100, 0.3, 42);
//! assert_eq!(records.len(), 100);
//! assert_eq!(records.iter().filter(|r| r.label == Label::Phishing).count(), 30);
//! ```

pub mod catalogue;
pub mod pattern;

use catalogue::{BENIGN_PATHS, LEGIT_DOMAINS, SUBDOMAIN_LABELS, TLDS};
use pattern::DeceptionPattern;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Probability that a legitimate URL gets an alternate TLD
pub const ALT_TLD_RATE: f64 = 0.05;

/// Probability that a legitimate URL uses https
pub const LEGIT_HTTPS_RATE: f64 = 0.95;

/// Probability that any record is replaced by a bare `http://<ip>[:port]` URL
pub const RAW_IP_EDGE_RATE: f64 = 0.05;

/// Class label of a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Label {
    Legitimate,
    Phishing,
}

impl Label {
    pub fn as_u8(self) -> u8 {
        match self {
            Label::Legitimate => 0,
            Label::Phishing => 1,
        }
    }

    pub fn as_class(self) -> usize {
        self.as_u8() as usize
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> u8 {
        label.as_u8()
    }
}

impl TryFrom<u8> for Label {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Label::Legitimate),
            1 => Ok(Label::Phishing),
            other => Err(format!("label must be 0 or 1, got {}", other)),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Labeled URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub url: String,
    pub label: Label,
}

impl UrlRecord {
    pub fn new(url: impl Into<String>, label: Label) -> Self {
        Self {
            url: url.into(),
            label,
        }
    }
}

/// `(legit_count, phish_count)` for a corpus of `total_count` records
///
/// `phish_count = floor(total_count * phish_ratio)`; the ratio is clamped to
/// [0, 1] and a non-finite ratio counts as 0.
pub fn split_counts(total_count: usize, phish_ratio: f64) -> (usize, usize) {
    let ratio = if phish_ratio.is_finite() {
        phish_ratio.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let phish_count = ((total_count as f64 * ratio).floor() as usize).min(total_count);
    (total_count - phish_count, phish_count)
}

/// Generate a shuffled corpus of legitimate and phishing records
pub fn generate<R: Rng + ?Sized>(
    total_count: usize,
    phish_ratio: f64,
    rng: &mut R,
) -> Vec<UrlRecord> {
    let (legit_count, phish_count) = split_counts(total_count, phish_ratio);
    tracing::debug!(legit_count, phish_count, "generating synthetic corpus");

    let mut records = Vec::with_capacity(total_count);
    for _ in 0..legit_count {
        let url = edge_or_else(rng, make_legit_url);
        records.push(UrlRecord::new(url, Label::Legitimate));
    }
    for _ in 0..phish_count {
        let url = edge_or_else(rng, make_phish_url);
        records.push(UrlRecord::new(url, Label::Phishing));
    }

    records.shuffle(rng);
    records
}

/// [`generate`] with a fresh `StdRng` seeded from `seed`
pub fn generate_seeded(total_count: usize, phish_ratio: f64, seed: u64) -> Vec<UrlRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    generate(total_count, phish_ratio, &mut rng)
}

fn edge_or_else<R, F>(rng: &mut R, make: F) -> String
where
    R: Rng + ?Sized,
    F: FnOnce(&mut R) -> String,
{
    if rng.gen::<f64>() < RAW_IP_EDGE_RATE {
        raw_ip_edge_url(rng)
    } else {
        make(rng)
    }
}

/// Legitimate-looking URL on a catalogue domain
pub fn make_legit_url<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut domain = pick(rng, &LEGIT_DOMAINS).to_string();
    if rng.gen::<f64>() < ALT_TLD_RATE {
        domain = format!("{}.{}", catalogue::brand_label(&domain), pick(rng, &TLDS));
    }
    let host = with_subdomain(&domain, rng);
    let path = pick(rng, &BENIGN_PATHS);
    let scheme = if rng.gen::<f64>() < LEGIT_HTTPS_RATE {
        "https"
    } else {
        "http"
    };
    format!("{}://{}{}", scheme, host, path)
}

/// Phishing URL built from a randomly chosen deception pattern
pub fn make_phish_url<R: Rng + ?Sized>(rng: &mut R) -> String {
    DeceptionPattern::choose(rng).generate(rng)
}

/// `http://<ip>` or `http://<ip>:<port>`
pub fn raw_ip_edge_url<R: Rng + ?Sized>(rng: &mut R) -> String {
    let ip = random_ipv4(rng);
    if rng.gen_bool(0.5) {
        format!("http://{}", ip)
    } else {
        format!("http://{}:{}", ip, rng.gen_range(8000..=50000u32))
    }
}

pub(crate) fn pick<'a, R: Rng + ?Sized>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items[rng.gen_range(0..items.len())]
}

pub(crate) fn random_scheme<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    if rng.gen_bool(0.5) {
        "http"
    } else {
        "https"
    }
}

pub(crate) fn random_ipv4<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..4)
        .map(|_| rng.gen_range(1..=255u8).to_string())
        .collect::<Vec<_>>()
        .join(".")
}

pub(crate) fn with_subdomain<R: Rng + ?Sized>(domain: &str, rng: &mut R) -> String {
    match pick(rng, &SUBDOMAIN_LABELS) {
        "" | "www" => domain.to_string(),
        label => format!("{}.{}", label, domain),
    }
}
