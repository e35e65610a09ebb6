//! Trailing `WITH key[=value]` clauses.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CoreError, Result};

/// The repeated `WITH key[=value]` suffix a statement may end with.
///
/// Values cannot contain whitespace, which is what lets the suffix be
/// anchored at the end of a statement.
pub(crate) const WITH_SUFFIX: &str = r"((?:\s+WITH\s+[\w\-]+(?:\s*=\s*\S*)?)*)";

static RE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|\s+)WITH\s+").expect("valid regex"));
static RE_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\w\-]+)(?:\s*=\s*(\S*))?$").expect("valid regex"));

/// Case-insensitive mapping of `WITH` options to their raw values.
///
/// Keys are stored upper-cased; a bare flag has the value `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct WithOptions {
    entries: BTreeMap<String, String>,
}

impl WithOptions {
    /// Parses a `WITH a=1 WITH b ...` suffix. An empty input yields no options.
    pub fn parse(input: &str) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for part in RE_SPLIT.split(input.trim()) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let caps = RE_OPTION
                .captures(part)
                .ok_or_else(|| CoreError::validation(format!("invalid WITH option \"{part}\"")))?;
            let key = normalize_key(&caps[1]);
            let value = caps.get(2).map_or("", |m| m.as_str()).to_string();
            if entries.insert(key.clone(), value).is_some() {
                return Err(CoreError::validation(format!(
                    "option {key} is specified more than once"
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Builds options directly from `(key, value)` pairs.
    #[must_use]
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (normalize_key(k), v.to_string()))
                .collect(),
        }
    }

    /// Returns the raw value of `key` (case-insensitive).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_uppercase())
            .map(String::as_str)
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the first of `aliases` that is present, with its value.
    #[must_use]
    pub fn get_any<'k>(&self, aliases: &[&'k str]) -> Option<(&'k str, &str)> {
        aliases
            .iter()
            .find_map(|alias| self.get(alias).map(|value| (*alias, value)))
    }

    /// Returns true if no options were given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Fails if both `first` and `second` are present.
    pub fn only_one_of(&self, first: &str, second: &str) -> Result<()> {
        if self.contains(first) && self.contains(second) {
            return Err(CoreError::ConflictingOptions {
                first: first.to_ascii_uppercase(),
                second: second.to_ascii_uppercase(),
            });
        }
        Ok(())
    }

    /// Fails on the first key not listed in `accepted`.
    pub fn accept_only(&self, statement: &'static str, accepted: &[&str]) -> Result<()> {
        match self
            .entries
            .keys()
            .find(|key| !accepted.iter().any(|a| a.eq_ignore_ascii_case(key)))
        {
            Some(key) => Err(CoreError::UnknownOption {
                statement,
                key: key.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Reads a boolean flag: absent is `false`, bare or `true` is `true`,
    /// anything else is an error.
    pub fn flag(&self, key: &str) -> Result<bool> {
        match self.get(key) {
            None => Ok(false),
            Some(v) if v.is_empty() || v.eq_ignore_ascii_case("true") => Ok(true),
            Some(v) => Err(CoreError::InvalidOption {
                key: key.to_ascii_uppercase(),
                value: v.to_string(),
            }),
        }
    }

    /// Reads a non-negative integer option.
    pub fn non_negative(&self, key: &str) -> Result<Option<u64>> {
        self.get(key)
            .map(|v| {
                v.parse::<u64>().map_err(|_| CoreError::InvalidOption {
                    key: key.to_ascii_uppercase(),
                    value: v.to_string(),
                })
            })
            .transpose()
    }
}

/// Upper-cases a key and undoes the legacy `WITH withPk=...` spelling, where
/// the keyword got glued to the option name.
fn normalize_key(raw: &str) -> String {
    let key = raw.to_ascii_uppercase();
    match key.strip_prefix("WITH") {
        Some(rest) if !rest.is_empty() => rest.trim_start_matches(['_', '-']).to_string(),
        _ => key,
    }
}
