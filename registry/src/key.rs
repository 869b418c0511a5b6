//! Method identifiers.

use std::borrow::Borrow;
use std::fmt;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

const KEY_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)+$";

fn key_regex() -> &'static Regex {
    static KEY_REGEX: OnceLock<Regex> = OnceLock::new();
    KEY_REGEX.get_or_init(|| match Regex::new(KEY_PATTERN) {
        Ok(re) => re,
        Err(e) => panic!("method key pattern does not compile: {e}"),
    })
}

/// A validated method identifier: a `::` path of at least two identifiers,
/// such as `Orders::place` or `billing::Invoices::issue`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MethodKey(String);

impl MethodKey {
    pub fn parse(raw: impl Into<String>) -> RegistryResult<Self> {
        let raw = raw.into();
        if !key_regex().is_match(&raw) {
            return Err(RegistryError::InvalidMethodKey(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The owning type: everything before the last `::`.
    pub fn owner(&self) -> &str {
        self.0.rsplit_once("::").map_or("", |(owner, _)| owner)
    }

    /// The method name after the last `::`.
    pub fn method(&self) -> &str {
        self.0.rsplit_once("::").map_or(self.0.as_str(), |(_, method)| method)
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for MethodKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MethodKey {
    type Error = RegistryError;

    fn try_from(raw: String) -> RegistryResult<Self> {
        Self::parse(raw)
    }
}

impl From<MethodKey> for String {
    fn from(key: MethodKey) -> Self {
        key.0
    }
}
