//! Lexical URL features
//!
//! Five scalar features derived from the characters of a URL string. No
//! network lookups and no parsing that can fail: every function here is total
//! over arbitrary input, including the empty string.
//!
//! | Column             | Meaning                                                |
//! |--------------------|--------------------------------------------------------|
//! | `url_length`       | character count of the raw string                      |
//! | `dot_count`        | number of `.` characters                               |
//! | `https`            | 1 if the lower-cased string starts with `https`        |
//! | `suspicious_words` | 1 if it contains a phishing keyword                    |
//! | `host_entropy`     | Shannon entropy (bits) of the host's characters        |

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Keywords whose presence anywhere in the lower-cased URL sets `suspicious_words`
pub const SUSPICIOUS_WORDS: [&str; 6] = ["login", "verify", "update", "secure", "account", "bank"];

/// Feature vector for a single URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub url_length: usize,
    pub dot_count: usize,
    #[serde(rename = "https")]
    pub has_https: u8,
    #[serde(rename = "suspicious_words")]
    pub has_suspicious_words: u8,
    pub host_entropy: f64,
}

impl FeatureVector {
    /// Value of a column by its schema name
    pub fn value(&self, column: &str) -> Option<f64> {
        match column {
            "url_length" => Some(self.url_length as f64),
            "dot_count" => Some(self.dot_count as f64),
            "https" => Some(self.has_https as f64),
            "suspicious_words" => Some(self.has_suspicious_words as f64),
            "host_entropy" => Some(self.host_entropy),
            _ => None,
        }
    }

    /// Column/value pairs in canonical order, for display
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("url_length", self.url_length.to_string()),
            ("dot_count", self.dot_count.to_string()),
            ("https", self.has_https.to_string()),
            ("suspicious_words", self.has_suspicious_words.to_string()),
            ("host_entropy", format!("{:.4}", self.host_entropy)),
        ]
    }
}

/// Extract all features from a URL string
pub fn extract(url: &str) -> FeatureVector {
    FeatureVector {
        url_length: url_length(url),
        dot_count: dot_count(url),
        has_https: has_https(url),
        has_suspicious_words: has_suspicious_words(url),
        host_entropy: host_entropy(url),
    }
}

/// Extract features for every URL, preserving order
///
/// Rows are independent; there is no state shared between them.
pub fn extract_batch<S: AsRef<str>>(urls: &[S]) -> Vec<FeatureVector> {
    urls.iter().map(|u| extract(u.as_ref())).collect()
}

pub fn url_length(url: &str) -> usize {
    url.chars().count()
}

pub fn dot_count(url: &str) -> usize {
    url.chars().filter(|&c| c == '.').count()
}

/// Prefix check only: `httpsx://host` counts as https.
pub fn has_https(url: &str) -> u8 {
    u8::from(url.to_lowercase().starts_with("https"))
}

pub fn has_suspicious_words(url: &str) -> u8 {
    let lower = url.to_lowercase();
    u8::from(SUSPICIOUS_WORDS.iter().any(|w| lower.contains(w)))
}

/// Shannon entropy of the host portion of a URL
pub fn host_entropy(url: &str) -> f64 {
    shannon_entropy(&host_of(url))
}

/// Host portion of a URL, or an empty string when there is none
///
/// The host is sliced out of the authority as written and only lowercased.
/// IDNs stay in Unicode, percent escapes stay escaped and numeric IPv4 forms
/// are not rewritten, so entropy is measured on the surface form. Scheme-less
/// strings like `example.com/login` still produce a host.
pub fn host_of(url: &str) -> String {
    lexical_host(url.trim()).to_lowercase()
}

fn lexical_host(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(idx) if is_scheme(&url[..idx]) => &url[idx + 3..],
        _ => url.strip_prefix("//").unwrap_or(url),
    };

    let authority = rest
        .split(|c| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or("");

    let host_port = match authority.rfind('@') {
        Some(idx) => &authority[idx + 1..],
        None => authority,
    };

    match host_port.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => host_port,
    }
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Shannon entropy (base 2) of the character distribution of `text`
pub fn shannon_entropy(text: &str) -> f64 {
    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for c in text.chars() {
        *counts.entry(c).or_insert(0) += 1;
        total += 1;
    }

    if total == 0 {
        return 0.0;
    }

    let total = total as f64;
    counts
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            p * (1.0 / p).log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string() {
        let f = extract("");
        assert_eq!(f.url_length, 0);
        assert_eq!(f.dot_count, 0);
        assert_eq!(f.has_https, 0);
        assert_eq!(f.has_suspicious_words, 0);
        assert_eq!(f.host_entropy, 0.0);
    }

    #[test]
    fn test_https_prefix_semantics() {
        assert_eq!(has_https("HTTPS://x"), 1);
        assert_eq!(has_https("http://x"), 0);
        assert_eq!(has_https("httpsx://x"), 1);
        assert_eq!(has_https(" https://x"), 0);
    }

    #[test]
    fn test_suspicious_words() {
        assert_eq!(has_suspicious_words("http://mybank.com/home"), 1);
        assert_eq!(has_suspicious_words("http://example.com/about"), 0);
        assert_eq!(has_suspicious_words("HTTP://EXAMPLE.COM/LOGIN"), 1);
    }

    #[test]
    fn test_length_counts_characters() {
        assert_eq!(url_length("http://bücher.de"), 16);
        assert_eq!(dot_count("a.b.c."), 3);
    }

    #[test]
    fn test_host_of_keeps_surface_form() {
        assert_eq!(host_of("http://bücher.de/x"), "bücher.de");
        assert_eq!(host_of("http://0x7f.1/login"), "0x7f.1");
        assert_eq!(host_of("http://ex%41mple.com/"), "ex%41mple.com");
        assert_eq!(host_of("HTTP://BÜCHER.DE"), "bücher.de");

        let entropy = host_entropy("http://bücher.de/x");
        assert!((entropy - 2.9477).abs() < 1e-3, "{}", entropy);
        assert!(host_entropy("http://ex%41mple.com/") > host_entropy("http://example.com/"));
    }

    #[test]
    fn test_host_of_url() {
        assert_eq!(host_of("https://www.Wikipedia.org/about"), "www.wikipedia.org");
        assert_eq!(host_of("http://192.168.1.5/login.php"), "192.168.1.5");
        assert_eq!(host_of("http://user:pw@example.com:8080/x"), "example.com");
    }

    #[test]
    fn test_host_of_lexical_fallback() {
        assert_eq!(host_of("example.com/login"), "example.com");
        assert_eq!(host_of("//cdn.example.com/a.js"), "cdn.example.com");
        assert_eq!(host_of("Example.com:443?q=1"), "example.com");
        assert_eq!(host_of("/just/a/path"), "");
        assert_eq!(host_of(""), "");
    }

    #[test]
    fn test_entropy_values() {
        assert_eq!(shannon_entropy(""), 0.0);
        assert_eq!(shannon_entropy("aaaa"), 0.0);
        assert!((shannon_entropy("ab") - 1.0).abs() < 1e-12);
        assert!((shannon_entropy("abcd") - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_entropy_never_negative_zero() {
        assert!(shannon_entropy("zzz").is_sign_positive());
    }

    #[test]
    fn test_value_lookup() {
        let f = extract("https://login.example.com");
        assert_eq!(f.value("https"), Some(1.0));
        assert_eq!(f.value("suspicious_words"), Some(1.0));
        assert_eq!(f.value("dot_count"), Some(2.0));
        assert_eq!(f.value("nope"), None);
    }

    #[test]
    fn test_batch_matches_single() {
        let urls = ["http://a.com", "", "https://secure-bank.io/verify"];
        let batch = extract_batch(&urls);
        assert_eq!(batch.len(), 3);
        for (url, features) in urls.iter().zip(batch.iter()) {
            assert_eq!(&extract(url), features);
        }
    }

    #[test]
    fn test_serializes_with_column_names() {
        let json = serde_json::to_value(extract("https://a.b")).unwrap();
        assert!(json.get("https").is_some());
        assert!(json.get("suspicious_words").is_some());
        assert!(json.get("host_entropy").is_some());
    }
}
