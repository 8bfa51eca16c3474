//! Flattening of repeated, delimiter-joined header values.
//!
//! A header like `X-Forwarded-For` may appear several times on one request and
//! each occurrence may itself be a comma-joined chain. [`flatten_delimited`]
//! turns that into one ordered list of distinct values.

use std::collections::HashSet;

/// Split every input on `separator`, trim the pieces, and return the distinct
/// non-empty pieces in order of first appearance.
///
/// The separator is matched literally. An empty separator splits between
/// every character (not byte).
///
/// ```
/// use myip::client_ip::flatten_delimited;
///
/// let ips = flatten_delimited(["1.1.1.1", "2.2.2.2, 3.3.3.3", "3.3.3.3, 4.4.4.4"], ",");
/// assert_eq!(ips, ["1.1.1.1", "2.2.2.2", "3.3.3.3", "4.4.4.4"]);
/// ```
pub fn flatten_delimited<'a, I>(inputs: I, separator: &str) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut flat = Vec::new();

    for input in inputs {
        // `split("")` matches at every char boundary, including both ends; the
        // empty pieces it yields at the ends are dropped below
        for piece in input.split(separator).map(str::trim) {
            if !piece.is_empty() && seen.insert(piece) {
                flat.push(piece);
            }
        }
    }

    flat
}
