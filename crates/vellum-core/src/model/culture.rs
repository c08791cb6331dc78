use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::ParseEnumError;

const INVARIANT_KEY: &str = "*";

/// A culture code (`en-us`, `fr`, ...) or the invariant sentinel.
///
/// Codes are normalized to trimmed ASCII lowercase so `en-US` and `en-us`
/// address the same variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Culture(String);

impl Culture {
    /// The key used for items (or properties) that do not vary by culture.
    #[must_use]
    pub fn invariant() -> Self {
        Self(INVARIANT_KEY.to_string())
    }

    #[must_use]
    pub fn is_invariant(&self) -> bool {
        self.0 == INVARIANT_KEY
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Culture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Culture {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let valid = normalized == INVARIANT_KEY
            || (!normalized.is_empty()
                && normalized
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        if valid {
            Ok(Self(normalized))
        } else {
            Err(ParseEnumError {
                expected: "culture",
                got: s.to_string(),
            })
        }
    }
}

impl TryFrom<String> for Culture {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Culture> for String {
    fn from(value: Culture) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::Culture;

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        let culture: Culture = "  en-US ".parse().unwrap();
        assert_eq!(culture.as_str(), "en-us");
        assert_eq!(culture, "en-us".parse().unwrap());
    }

    #[test]
    fn invariant_roundtrips() {
        let invariant: Culture = "*".parse().unwrap();
        assert!(invariant.is_invariant());
        assert_eq!(invariant, Culture::invariant());
        assert!(!"fr".parse::<Culture>().unwrap().is_invariant());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<Culture>().is_err());
        assert!("en us".parse::<Culture>().is_err());
        assert!("fr/ca".parse::<Culture>().is_err());
    }

    #[test]
    fn serde_uses_plain_strings() {
        let culture: Culture = "de".parse().unwrap();
        assert_eq!(serde_json::to_string(&culture).unwrap(), "\"de\"");
        assert_eq!(serde_json::from_str::<Culture>("\"DE\"").unwrap(), culture);
        assert!(serde_json::from_str::<Culture>("\"d e\"").is_err());
    }
}
