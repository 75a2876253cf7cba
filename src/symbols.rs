//! Symbol normalization and validation
//!
//! The exchange quotes every crypto pair against USD, so "btc", "BTC" and
//! "BTC-USD" all refer to the same trading pair.

/// Normalize a user-supplied symbol to the canonical `BASE-USD` form
pub fn normalize_to_usd(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    if upper.ends_with("-USD") {
        upper
    } else {
        format!("{}-USD", upper)
    }
}

/// Whether a symbol matches the allowed formats (e.g. `BTC` or `BTC-USD`)
pub fn validate(symbol: &str) -> bool {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        return false;
    }
    let upper = trimmed.to_uppercase();
    let base = upper.strip_suffix("-USD").unwrap_or(&upper);
    !base.is_empty() && base.chars().all(|c| c.is_ascii_alphanumeric())
}
