//! List and title identifiers.
//!
//! Both are a fixed two-letter prefix followed by digits. They are compared
//! and stored lowercase.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

static LIST_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bls(\d{4,})\b").expect("valid list id regex"));

static TITLE_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^tt(\d{5,})$").expect("valid title id regex"));

/// Error returned when a string does not contain a usable identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidIdentifier {
    #[error("No list identifier (ls followed by digits) found in '{input}'")]
    List { input: String },

    #[error("'{input}' is not a title identifier (tt followed by digits)")]
    Title { input: String },
}

/// Identifier of a public list, e.g. `ls4103816671`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListId(String);

impl ListId {
    /// Extracts the canonical list id from a raw URL or a bare identifier.
    ///
    /// # Errors
    ///
    /// - `InvalidIdentifier::List` - If no `ls<digits>` token is present
    pub fn parse_source(source: &str) -> Result<Self, InvalidIdentifier> {
        LIST_ID_PATTERN
            .captures(source.trim())
            .and_then(|caps| caps.get(1))
            .map(|digits| Self(format!("ls{}", digits.as_str())))
            .ok_or_else(|| InvalidIdentifier::List {
                input: source.to_string(),
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ListId {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_source(s)
    }
}

impl Serialize for ListId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ListId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse_source(&raw).map_err(serde::de::Error::custom)
    }
}

/// Identifier of one title within a list, e.g. `tt0111161`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TitleId(String);

impl TitleId {
    /// Parses a bare title id, normalizing case.
    ///
    /// # Errors
    ///
    /// - `InvalidIdentifier::Title` - If the input is not `tt<digits>`
    pub fn parse(raw: &str) -> Result<Self, InvalidIdentifier> {
        let trimmed = raw.trim();
        if TITLE_ID_PATTERN.is_match(trimmed) {
            Ok(Self(trimmed.to_ascii_lowercase()))
        } else {
            Err(InvalidIdentifier::Title {
                input: raw.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TitleId {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TitleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TitleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_id_from_url_with_query() {
        let id = ListId::parse_source("https://example.com/list/ls4103816671/?foo=bar").unwrap();
        assert_eq!(id.as_str(), "ls4103816671");
    }

    #[test]
    fn test_list_id_bare_and_uppercase() {
        assert_eq!(ListId::parse_source("ls0123456").unwrap().as_str(), "ls0123456");
        assert_eq!(ListId::parse_source(" LS998877 ").unwrap().as_str(), "ls998877");
    }

    #[test]
    fn test_list_id_rejects_malformed() {
        assert!(ListId::parse_source("https://example.com/user/ur123/").is_err());
        assert!(ListId::parse_source("").is_err());
        assert!(ListId::parse_source("tools1234").is_err());
    }

    #[test]
    fn test_title_id_normalizes_case() {
        let id = TitleId::parse("TT0111161").unwrap();
        assert_eq!(id.as_str(), "tt0111161");
        assert!(TitleId::parse("nm0000001").is_err());
        assert!(TitleId::parse("tt12").is_err());
    }

    #[test]
    fn test_identifiers_serialize_as_strings() {
        let id = TitleId::parse("tt0000001").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"tt0000001\"");
        let back: TitleId = serde_json::from_str("\"TT0000001\"").unwrap();
        assert_eq!(back, id);
    }
}
