//! Deception patterns used to fabricate phishing URLs
//!
//! Each pattern is a pure function of the random source. The pattern for a
//! record is picked with a single uniform draw mapped through
//! [`PATTERN_WEIGHTS`].

use super::catalogue::{
    brand_label, ATTACKER_LABELS, EMBED_ACTIONS, EMBED_HOSTS, LEGIT_DOMAINS, LOOKALIKE_ACTIONS,
    PHISH_KEYWORDS, REFERRALS, TLDS, TOKEN_ALPHABET, TOKEN_HOSTS, TOKEN_LEN, TYPOSQUAT_ACTIONS,
    TYPOSQUAT_SUFFIXES,
};
use super::{pick, random_ipv4, random_scheme, with_subdomain};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// URL construction template for a phishing example
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeceptionPattern {
    /// Small character-level edit of a well-known domain
    Typosquat,
    /// Real domain name placed in the path of an attacker host
    EmbeddedDomainPath,
    /// Dotted-quad IPv4 host
    RawIpHost,
    /// Brand label as a subdomain of an attacker domain
    LookalikeSubdomain,
    /// Long random token in the query string
    LongQueryToken,
}

/// Selection weights; they sum to 1.0
pub const PATTERN_WEIGHTS: [(DeceptionPattern, f64); 5] = [
    (DeceptionPattern::Typosquat, 0.35),
    (DeceptionPattern::EmbeddedDomainPath, 0.25),
    (DeceptionPattern::RawIpHost, 0.15),
    (DeceptionPattern::LookalikeSubdomain, 0.15),
    (DeceptionPattern::LongQueryToken, 0.10),
];

impl DeceptionPattern {
    pub const ALL: [DeceptionPattern; 5] = [
        DeceptionPattern::Typosquat,
        DeceptionPattern::EmbeddedDomainPath,
        DeceptionPattern::RawIpHost,
        DeceptionPattern::LookalikeSubdomain,
        DeceptionPattern::LongQueryToken,
    ];

    /// Map a uniform draw in [0, 1) onto a pattern by cumulative weight
    pub fn from_draw(draw: f64) -> Self {
        let mut cumulative = 0.0;
        for (pattern, weight) in PATTERN_WEIGHTS {
            cumulative += weight;
            if draw < cumulative {
                return pattern;
            }
        }
        PATTERN_WEIGHTS[PATTERN_WEIGHTS.len() - 1].0
    }

    pub fn choose<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from_draw(rng.gen::<f64>())
    }

    pub fn name(self) -> &'static str {
        match self {
            DeceptionPattern::Typosquat => "typosquat",
            DeceptionPattern::EmbeddedDomainPath => "embedded-domain-path",
            DeceptionPattern::RawIpHost => "raw-ip-host",
            DeceptionPattern::LookalikeSubdomain => "lookalike-subdomain",
            DeceptionPattern::LongQueryToken => "long-query-token",
        }
    }

    /// Build a URL following this pattern
    pub fn generate<R: Rng + ?Sized>(self, rng: &mut R) -> String {
        match self {
            DeceptionPattern::Typosquat => typosquat_url(rng),
            DeceptionPattern::EmbeddedDomainPath => embedded_domain_url(rng),
            DeceptionPattern::RawIpHost => raw_ip_url(rng),
            DeceptionPattern::LookalikeSubdomain => lookalike_subdomain_url(rng),
            DeceptionPattern::LongQueryToken => long_query_token_url(rng),
        }
    }
}

/// Single edit applied to a domain's primary label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TyposquatMutation {
    /// Insert a random lowercase letter
    InsertChar,
    /// Drop the final character
    DropLast,
    /// Replace every `o` with `0` or every `i` with `1`
    DigitHomoglyph,
    /// Append `-secure` or `-login`
    SuspiciousSuffix,
    /// Repeat one character in place
    DuplicateChar,
}

impl TyposquatMutation {
    pub const ALL: [TyposquatMutation; 5] = [
        TyposquatMutation::InsertChar,
        TyposquatMutation::DropLast,
        TyposquatMutation::DigitHomoglyph,
        TyposquatMutation::SuspiciousSuffix,
        TyposquatMutation::DuplicateChar,
    ];

    pub fn choose<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    /// Apply the mutation to `label`
    ///
    /// Always returns a string different from a non-empty `label`; an edit
    /// that would not change anything falls back to inserting a letter.
    pub fn apply<R: Rng + ?Sized>(self, label: &str, rng: &mut R) -> String {
        let chars: Vec<char> = label.chars().collect();
        match self {
            TyposquatMutation::InsertChar => insert_char(&chars, rng),
            TyposquatMutation::DropLast => {
                if chars.len() > 1 {
                    chars[..chars.len() - 1].iter().collect()
                } else {
                    insert_char(&chars, rng)
                }
            }
            TyposquatMutation::DigitHomoglyph => {
                let glyphs: Vec<(char, char)> = [('o', '0'), ('i', '1')]
                    .into_iter()
                    .filter(|(from, _)| chars.contains(from))
                    .collect();
                if glyphs.is_empty() {
                    insert_char(&chars, rng)
                } else {
                    let (from, to) = glyphs[rng.gen_range(0..glyphs.len())];
                    chars
                        .iter()
                        .map(|&c| if c == from { to } else { c })
                        .collect()
                }
            }
            TyposquatMutation::SuspiciousSuffix => {
                format!("{}-{}", label, pick(rng, &TYPOSQUAT_SUFFIXES))
            }
            TyposquatMutation::DuplicateChar => {
                if chars.is_empty() {
                    insert_char(&chars, rng)
                } else {
                    let idx = rng.gen_range(0..chars.len());
                    let mut out = chars.clone();
                    out.insert(idx, chars[idx]);
                    out.into_iter().collect()
                }
            }
        }
    }
}

fn insert_char<R: Rng + ?Sized>(chars: &[char], rng: &mut R) -> String {
    let letter = (b'a' + rng.gen_range(0..26u8)) as char;
    let idx = rng.gen_range(0..=chars.len());
    let mut out = chars.to_vec();
    out.insert(idx, letter);
    out.into_iter().collect()
}

/// Typosquat a catalogue domain: `paypal.com` → `paypa1.com`, `paypal-secure.com`, ...
pub fn typosquat_domain<R: Rng + ?Sized>(domain: &str, rng: &mut R) -> String {
    let (name, tld) = domain.split_once('.').unwrap_or((domain, "com"));
    let mutated = TyposquatMutation::choose(rng).apply(name, rng);
    format!("{}.{}", mutated, tld)
}

fn typosquat_url<R: Rng + ?Sized>(rng: &mut R) -> String {
    let base = pick(rng, &LEGIT_DOMAINS);
    let domain = typosquat_domain(base, rng);
    let host = with_subdomain(&domain, rng);
    let path = format!(
        "/{}/{}",
        pick(rng, &PHISH_KEYWORDS),
        pick(rng, &TYPOSQUAT_ACTIONS)
    );
    format!("{}://{}{}", random_scheme(rng), host, path)
}

fn embedded_domain_url<R: Rng + ?Sized>(rng: &mut R) -> String {
    let host = pick(rng, &EMBED_HOSTS);
    let embedded = pick(rng, &LEGIT_DOMAINS);
    let path = format!("/{}/{}", embedded, pick(rng, &EMBED_ACTIONS));
    format!("{}://{}{}", random_scheme(rng), host, path)
}

fn raw_ip_url<R: Rng + ?Sized>(rng: &mut R) -> String {
    let ip = random_ipv4(rng);
    format!("http://{}/{}.php", ip, pick(rng, &PHISH_KEYWORDS))
}

fn lookalike_subdomain_url<R: Rng + ?Sized>(rng: &mut R) -> String {
    let brand = brand_label(pick(rng, &LEGIT_DOMAINS));
    let attacker = pick(rng, &ATTACKER_LABELS);
    let tld = pick(rng, &TLDS);
    let path = format!(
        "/{}/{}",
        pick(rng, &PHISH_KEYWORDS),
        pick(rng, &LOOKALIKE_ACTIONS)
    );
    format!(
        "{}://{}.{}.{}{}",
        random_scheme(rng),
        brand,
        attacker,
        tld,
        path
    )
}

fn long_query_token_url<R: Rng + ?Sized>(rng: &mut R) -> String {
    let host = pick(rng, &TOKEN_HOSTS);
    let token: String = (0..TOKEN_LEN)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect();
    let referral = pick(rng, &REFERRALS);
    let path = format!("/{}", pick(rng, &PHISH_KEYWORDS));
    // Always https
    format!("https://{}{}?token={}&ref={}", host, path, token, referral)
}
