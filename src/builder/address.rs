//! Server address validation.

use std::sync::LazyLock;

use regex::Regex;

/// `host:port`, host made of path-like characters, port of 2 to 5 digits.
static ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.\-/]+:\d{2,5}$").expect("address pattern is valid"));

/// True if `address` can be used as an upstream server.
pub fn is_valid_address(address: &str) -> bool {
    ADDRESS.is_match(address)
}
