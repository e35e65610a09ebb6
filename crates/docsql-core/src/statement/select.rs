//! `SELECT`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::require_names;
use crate::error::{CoreError, Result};
use crate::options::{WithOptions, WITH_SUFFIX};
use crate::parser::ParseError;

static RE_SELECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)^SELECT(\s+CROSS\s+PARTITION)?\s+(.*?){WITH_SUFFIX}\s*$"
    ))
    .expect("valid regex")
});
static RE_FROM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bFROM\s+([\w\-]+)").expect("valid regex"));

const ACCEPTED_KEYS: [&str; 6] = [
    "DATABASE",
    "DB",
    "COLLECTION",
    "TABLE",
    "CROSS_PARTITION",
    "CROSSPARTITION",
];

/// A named query parameter as sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParam {
    /// Parameter name, e.g. `@_1`.
    pub name: String,
    /// Bound value.
    pub value: JsonValue,
}

/// `SELECT [CROSS PARTITION] ... [WITH database|db=..] [WITH collection|table=..]
/// [WITH cross_partition[=true]]`.
///
/// Everything between `SELECT` and the `WITH` suffix is passed to the
/// backend, with positional placeholders renamed to `@_N`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Select {
    /// Database name.
    pub db_name: String,
    /// Collection name.
    pub coll_name: String,
    /// Whether the query may span partitions.
    pub is_cross_partition: bool,
    /// Backend query text.
    pub query: String,
    /// Placeholder index to parameter name.
    pub placeholders: BTreeMap<usize, String>,
    /// Highest placeholder index referenced.
    pub num_inputs: usize,
    /// The raw options.
    pub with_opts: WithOptions,
}

/// Renames `$N`, `@N` and `:N` outside string literals to `@_N`.
fn rename_placeholders(body: &str) -> (String, BTreeMap<usize, String>) {
    let mut out = String::with_capacity(body.len());
    let mut placeholders = BTreeMap::new();
    let mut chars = body.char_indices().peekable();
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;

    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some((_, escaped)) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            prev = Some(c);
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                out.push(c);
            }
            '$' | '@' | ':' if starts_placeholder(prev, c) => {
                let digits: String = body[i + 1..]
                    .chars()
                    .take_while(char::is_ascii_digit)
                    .collect();
                match digits.parse::<usize>() {
                    Ok(index) if index > 0 => {
                        let name = format!("@_{index}");
                        out.push_str(&name);
                        placeholders.insert(index, name);
                        for _ in 0..digits.len() {
                            chars.next();
                        }
                        prev = digits.chars().last();
                        continue;
                    }
                    _ => out.push(c),
                }
            }
            _ => out.push(c),
        }
        prev = Some(c);
    }
    (out, placeholders)
}

/// A placeholder sigil must not continue a word; `:` additionally must not
/// follow a closing quote or bracket, where it is an object-literal colon.
fn starts_placeholder(prev: Option<char>, sigil: char) -> bool {
    match prev {
        None => true,
        Some(p) if p.is_alphanumeric() || p == '_' => false,
        Some(p) if sigil == ':' => !matches!(p, '"' | '\'' | ']' | '}' | ')'),
        Some(_) => true,
    }
}

impl Select {
    /// Parses the statement, filling in `default_db` when no database is named.
    pub fn parse(input: &str, default_db: &str) -> Result<Self> {
        let caps = RE_SELECT
            .captures(input)
            .ok_or_else(|| ParseError::unrecognized("SELECT", input))?;
        let with_opts = WithOptions::parse(caps.get(3).map_or("", |m| m.as_str()))?;
        with_opts.accept_only("SELECT", &ACCEPTED_KEYS)?;
        with_opts.only_one_of("DATABASE", "DB")?;
        with_opts.only_one_of("COLLECTION", "TABLE")?;
        with_opts.only_one_of("CROSS_PARTITION", "CROSSPARTITION")?;

        let keyword_cross = caps.get(1).is_some();
        let mut option_cross = false;
        for key in ["CROSS_PARTITION", "CROSSPARTITION"] {
            option_cross |= with_opts.flag(key)?;
        }
        if keyword_cross && option_cross {
            return Err(CoreError::ConflictingOptions {
                first: "CROSS PARTITION".into(),
                second: "CROSS_PARTITION".into(),
            });
        }

        let body = caps[2].trim();
        let (renamed, placeholders) = rename_placeholders(body);
        let coll_name = match with_opts.get_any(&["COLLECTION", "TABLE"]) {
            Some((_, coll)) => coll.to_string(),
            None => RE_FROM
                .captures(&renamed)
                .map(|c| c[1].to_string())
                .unwrap_or_default(),
        };
        let db_name = with_opts
            .get_any(&["DATABASE", "DB"])
            .map_or(default_db, |(_, db)| db)
            .to_string();

        let stmt = Self {
            db_name,
            coll_name,
            is_cross_partition: keyword_cross || option_cross,
            query: format!("SELECT {renamed}"),
            num_inputs: placeholders.keys().max().copied().unwrap_or(0),
            placeholders,
            with_opts,
        };
        stmt.validate()?;
        Ok(stmt)
    }

    /// Checks cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        require_names(&self.db_name, Some(&self.coll_name))
    }

    /// Binds positional arguments to their `@_N` names.
    ///
    /// Every argument must correspond to a placeholder in the query.
    pub fn parameters(&self, args: &[JsonValue]) -> Result<Vec<QueryParam>> {
        args.iter()
            .enumerate()
            .map(|(i, value)| {
                let name = self.placeholders.get(&(i + 1)).ok_or_else(|| {
                    CoreError::validation(format!("there is no placeholder #{}", i + 1))
                })?;
                Ok(QueryParam {
                    name: name.clone(),
                    value: value.clone(),
                })
            })
            .collect()
    }
}
