use lazy_static::lazy_static;
use regex::Regex;

mod chain;
mod direct;
mod youtube;

pub use chain::*;
pub use direct::*;
pub use youtube::*;

lazy_static! {
    /// Matches a missing or insecure scheme, so bare hosts can be parsed as urls.
    static ref URL_SCHEME_REGEX: Regex = Regex::new(r"^(?:https?://)?").unwrap();
}

/// Prepends `https://` to references like `youtu.be/...`, replacing `http://`.
fn with_https_scheme(reference: &str) -> String {
    URL_SCHEME_REGEX.replace(reference, "https://").into_owned()
}
