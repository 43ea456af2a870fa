//! Media type identifiers used for content negotiation.

use std::borrow::Cow;
use std::fmt;

/// A media type reduced to its essence (`type/subtype`, lower case).
///
/// Parameters such as `charset` are dropped when parsing, so
/// `application/json; charset=utf-8` and `application/json` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType(Cow<'static, str>);

impl MediaType {
    pub const JSON: MediaType = MediaType(Cow::Borrowed("application/json"));
    pub const XML: MediaType = MediaType(Cow::Borrowed("application/xml"));
    pub const TEXT_PLAIN: MediaType = MediaType(Cow::Borrowed("text/plain"));
    pub const FORM: MediaType = MediaType(Cow::Borrowed("application/x-www-form-urlencoded"));

    /// Parse a `content-type` style value.
    pub fn parse(value: &str) -> MediaType {
        let essence = value.split(';').next().unwrap_or_default().trim();
        MediaType(Cow::Owned(essence.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Structured syntax suffix, e.g. `json` for `application/hal+json`.
    pub fn suffix(&self) -> Option<&str> {
        self.0.rsplit_once('+').map(|(_, suffix)| suffix)
    }
}

impl From<&str> for MediaType {
    fn from(value: &str) -> Self {
        MediaType::parse(value)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_drops_parameters_and_case() {
        assert_eq!(MediaType::parse("Application/JSON; charset=UTF-8"), MediaType::JSON);
        assert_eq!(MediaType::parse(" text/plain "), MediaType::TEXT_PLAIN);
    }

    #[test]
    fn suffix_is_detected() {
        assert_eq!(MediaType::parse("application/hal+json").suffix(), Some("json"));
        assert_eq!(MediaType::parse("application/atom+xml").suffix(), Some("xml"));
        assert_eq!(MediaType::JSON.suffix(), None);
    }
}
