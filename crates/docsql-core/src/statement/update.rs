//! `UPDATE`.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::{db_or_default, require_names, PkSource, QUALIFIED_NAME};
use crate::error::{CoreError, Result};
use crate::lexer::value::{max_placeholder, parse_value};
use crate::lexer::Literal;
use crate::options::{WithOptions, WITH_SUFFIX};
use crate::parser::ParseError;

static RE_UPDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)^UPDATE\s+{QUALIFIED_NAME}\s+SET\s+(.*?)\s+WHERE\s+id\s*=\s*(.*?){WITH_SUFFIX}\s*$"
    ))
    .expect("valid regex")
});
static RE_ASSIGN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([\w\-]+)\s*=").expect("valid regex"));
static RE_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[$@:](\d+)$").expect("valid regex"));

/// `UPDATE [<db>.]<coll> SET f=v[, f=v]* WHERE id=<value> [WITH ...]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Update {
    /// Database name.
    pub db_name: String,
    /// Collection name.
    pub coll_name: String,
    /// Fields to overwrite, in statement order.
    pub fields: Vec<String>,
    /// One value per field.
    pub values: Vec<Literal>,
    /// Document id: a string or a placeholder.
    pub id: Literal,
    /// Where partition-key paths come from.
    pub pk_source: PkSource,
    /// Highest placeholder index referenced.
    pub num_inputs: usize,
    /// The raw options.
    pub with_opts: WithOptions,
}

fn parse_assignments(raw: &str) -> Result<(Vec<String>, Vec<Literal>)> {
    let mut fields = Vec::new();
    let mut values = Vec::new();
    let mut rest = raw.trim();
    while !rest.is_empty() {
        let caps = RE_ASSIGN.captures(rest).ok_or_else(|| {
            ParseError::unexpected("<field>=<value>", rest, Default::default())
        })?;
        let (value, remainder) = parse_value(&rest[caps[0].len()..], Some(','))?;
        fields.push(caps[1].to_string());
        values.push(value);
        rest = remainder.trim_start();
    }
    Ok((fields, values))
}

/// Reads the id after `WHERE id=`: a placeholder, a quoted string (quotes
/// stripped as-is) or a bare word.
fn parse_id(raw: &str) -> Result<Literal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CoreError::validation("id value is missing"));
    }
    if let Some(caps) = RE_PLACEHOLDER.captures(raw) {
        let index: usize = caps[1]
            .parse()
            .map_err(|_| CoreError::validation(format!("invalid id placeholder \"{raw}\"")))?;
        if index > 0 {
            return Ok(Literal::Placeholder(index));
        }
    }
    if let Some(quoted) = raw.strip_prefix('"') {
        return quoted
            .strip_suffix('"')
            .map(|id| Literal::String(id.to_string()))
            .ok_or_else(|| ParseError::unexpected("a quoted id", raw, Default::default()).into());
    }
    if raw.contains(char::is_whitespace) || raw.contains('"') {
        return Err(ParseError::unexpected("an id", raw, Default::default()).into());
    }
    Ok(Literal::String(raw.to_string()))
}

impl Update {
    /// Parses the statement, filling in `default_db` when no database is named.
    pub fn parse(input: &str, default_db: &str) -> Result<Self> {
        let caps = RE_UPDATE
            .captures(input)
            .ok_or_else(|| ParseError::unrecognized("UPDATE", input))?;
        let with_opts = WithOptions::parse(caps.get(5).map_or("", |m| m.as_str()))?;
        with_opts.accept_only("UPDATE", &["PK", "SINGLE_PK", "SINGLEPK"])?;

        let (fields, values) = parse_assignments(&caps[3])?;
        let id = parse_id(&caps[4])?;
        let num_inputs = max_placeholder(values.iter().chain(std::iter::once(&id)));
        let stmt = Self {
            db_name: db_or_default(caps.get(1).map(|m| m.as_str()), default_db),
            coll_name: caps[2].to_string(),
            fields,
            values,
            id,
            pk_source: PkSource::from_options(&with_opts)?,
            num_inputs,
            with_opts,
        };
        stmt.validate()?;
        Ok(stmt)
    }

    /// Checks cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        require_names(&self.db_name, Some(&self.coll_name))?;
        if self.fields.is_empty() {
            return Err(CoreError::validation("SET clause is empty"));
        }
        Ok(())
    }

    /// Iterates over `(field, value)` pairs of the SET clause.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &Literal)> {
        self.fields.iter().map(String::as_str).zip(&self.values)
    }
}
