// Trusted network matching

//! Trust policy: decides whether an SSID is on the trusted list.

/// Case-insensitive exact match of `ssid` against `trusted`
pub fn is_trusted(ssid: &str, trusted: &[String]) -> bool {
    trusted.iter().any(|t| fold(t).eq(fold(ssid)))
}

/// Per-character case fold; upper-then-lower maps every sigma form to `σ`
fn fold(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars()
        .flat_map(char::to_uppercase)
        .flat_map(char::to_lowercase)
}
