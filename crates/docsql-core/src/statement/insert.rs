//! `INSERT` and `UPSERT`.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::{db_or_default, require_names, PkSource, QUALIFIED_NAME};
use crate::error::{CoreError, Result};
use crate::lexer::value::{max_placeholder, parse_value};
use crate::lexer::Literal;
use crate::options::{WithOptions, WITH_SUFFIX};
use crate::parser::ParseError;

static RE_INSERT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)^(INSERT|UPSERT)\s+INTO\s+{QUALIFIED_NAME}\s*\(([^)]*)\)\s*VALUES\s*\((.*)\){WITH_SUFFIX}\s*$"
    ))
    .expect("valid regex")
});

/// `INSERT|UPSERT INTO [<db>.]<coll> (<fields>) VALUES (<values>) [WITH ...]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insert {
    /// Database name.
    pub db_name: String,
    /// Collection name.
    pub coll_name: String,
    /// `UPSERT` rather than strict create.
    pub is_upsert: bool,
    /// Document fields, in statement order.
    pub fields: Vec<String>,
    /// One value per field.
    pub values: Vec<Literal>,
    /// Where partition-key paths come from.
    pub pk_source: PkSource,
    /// Highest placeholder index referenced.
    pub num_inputs: usize,
    /// The raw options.
    pub with_opts: WithOptions,
}

fn parse_fields(raw: &str) -> Result<Vec<String>> {
    raw.split(',')
        .map(|field| {
            let field = field.trim();
            if field.is_empty() || field.contains(char::is_whitespace) {
                return Err(CoreError::validation(format!(
                    "invalid field name \"{field}\" in \"{}\"",
                    raw.trim()
                )));
            }
            Ok(field.to_string())
        })
        .collect()
}

fn parse_values(raw: &str) -> Result<Vec<Literal>> {
    let mut values = Vec::new();
    let mut rest = raw.trim();
    while !rest.is_empty() {
        let (value, remainder) = parse_value(rest, Some(','))?;
        values.push(value);
        rest = remainder.trim_start();
    }
    Ok(values)
}

impl Insert {
    /// Parses the statement, filling in `default_db` when no database is named.
    pub fn parse(input: &str, default_db: &str) -> Result<Self> {
        let caps = RE_INSERT
            .captures(input)
            .ok_or_else(|| ParseError::unrecognized("INSERT", input))?;
        let with_opts = WithOptions::parse(caps.get(6).map_or("", |m| m.as_str()))?;
        with_opts.accept_only("INSERT", &["PK", "SINGLE_PK", "SINGLEPK"])?;

        let values = parse_values(&caps[5])?;
        let stmt = Self {
            db_name: db_or_default(caps.get(2).map(|m| m.as_str()), default_db),
            coll_name: caps[3].to_string(),
            is_upsert: caps[1].eq_ignore_ascii_case("UPSERT"),
            fields: parse_fields(&caps[4])?,
            num_inputs: max_placeholder(&values),
            values,
            pk_source: PkSource::from_options(&with_opts)?,
            with_opts,
        };
        stmt.validate()?;
        Ok(stmt)
    }

    /// Checks cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        require_names(&self.db_name, Some(&self.coll_name))?;
        if self.values.is_empty() {
            return Err(CoreError::validation("VALUES clause is empty"));
        }
        if self.fields.len() != self.values.len() {
            return Err(CoreError::validation(format!(
                "number of fields ({}) does not match number of values ({})",
                self.fields.len(),
                self.values.len()
            )));
        }
        Ok(())
    }

    /// Iterates over `(field, value)` pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &Literal)> {
        self.fields.iter().map(String::as_str).zip(&self.values)
    }
}
