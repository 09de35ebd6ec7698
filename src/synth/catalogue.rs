//! Fixed vocabularies the synthesizer draws from

/// Well-known legitimate domains
///
/// `stackoverflow.com` is listed twice, so it is drawn twice as often.
pub const LEGIT_DOMAINS: [&str; 20] = [
    "google.com",
    "facebook.com",
    "youtube.com",
    "amazon.com",
    "wikipedia.org",
    "twitter.com",
    "linkedin.com",
    "github.com",
    "microsoft.com",
    "apple.com",
    "reddit.com",
    "stackoverflow.com",
    "instagram.com",
    "dropbox.com",
    "netflix.com",
    "paypal.com",
    "quora.com",
    "bing.com",
    "live.com",
    "stackoverflow.com",
];

/// Alternate top-level domains
pub const TLDS: [&str; 7] = ["com", "net", "org", "io", "co", "info", "biz"];

/// Words phishing pages like to put in their paths
pub const PHISH_KEYWORDS: [&str; 9] = [
    "login", "verify", "secure", "update", "account", "signin", "confirm", "bank", "ebank",
];

/// Paths found on ordinary pages
pub const BENIGN_PATHS: [&str; 8] = [
    "",
    "/",
    "/home",
    "/about",
    "/contact",
    "/products",
    "/search?q=test",
    "/user/profile",
];

/// Subdomain labels; the empty label and `www` both mean no subdomain.
///
/// Several of these overlap with phishing vocabulary, so legitimate
/// URLs also trip `suspicious_words` now and then.
pub const SUBDOMAIN_LABELS: [&str; 7] = ["", "www", "secure", "login", "mail", "account", "update"];

/// Trailing action segment for typosquat paths
pub const TYPOSQUAT_ACTIONS: [&str; 4] = ["", "login", "user", "auth"];

/// Suffixes appended to a typosquatted label
pub const TYPOSQUAT_SUFFIXES: [&str; 2] = ["secure", "login"];

/// Attacker-owned hosts that carry a real domain in their path
pub const EMBED_HOSTS: [&str; 4] = [
    "secure-login.com",
    "auth-update.net",
    "confirm-pay.info",
    "verify-account.co",
];

/// Action segments following an embedded domain
pub const EMBED_ACTIONS: [&str; 3] = ["login", "signin", "verify"];

/// Attacker labels under which a brand appears as a subdomain
pub const ATTACKER_LABELS: [&str; 4] = ["secure-login", "account-update", "verify-page", "auth"];

/// Trailing segment for lookalike-subdomain paths
pub const LOOKALIKE_ACTIONS: [&str; 2] = ["", "login"];

/// Hosts used by the long-query-token pattern
pub const TOKEN_HOSTS: [&str; 4] = [
    "login-check.com",
    "account-verify.net",
    "securepay.info",
    "update-bank.co",
];

/// Values of the `ref` query parameter
pub const REFERRALS: [&str; 3] = ["email", "sms", "notification"];

/// Alphabet of the query token
pub const TOKEN_ALPHABET: &[u8] = b"abcdef0123456789";

/// Length of the query token
pub const TOKEN_LEN: usize = 20;

/// Primary label of a catalogue domain (`paypal.com` → `paypal`)
pub fn brand_label(domain: &str) -> &str {
    domain.split('.').next().unwrap_or(domain)
}
