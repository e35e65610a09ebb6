//! `DELETE`.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::{db_or_default, require_names, PkSource, QUALIFIED_NAME, SINGLE_PK_KEYS};
use crate::error::{CoreError, Result};
use crate::lexer::value::{max_placeholder, parse_value_or_word};
use crate::lexer::Literal;
use crate::options::{WithOptions, WITH_SUFFIX};
use crate::parser::ParseError;

static RE_DELETE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)^DELETE\s+FROM\s+{QUALIFIED_NAME}\s+WHERE\s+(.*?){WITH_SUFFIX}\s*$"
    ))
    .expect("valid regex")
});
static RE_CONDITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([\w\-]+)\s*=").expect("valid regex"));
static RE_AND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^and\s+").expect("valid regex"));

/// `DELETE FROM [<db>.]<coll> WHERE id=<v> [AND <pkfield>=<v>]* [WITH SINGLE_PK]`.
///
/// Every condition other than `id` names a partition-key field; their paths
/// become `/<field>` in the order written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delete {
    /// Database name.
    pub db_name: String,
    /// Collection name.
    pub coll_name: String,
    /// Document id.
    pub id: Literal,
    /// Values of the partition-key conditions, aligned with the explicit paths.
    pub pk_values: Vec<Literal>,
    /// Where partition-key paths come from.
    pub pk_source: PkSource,
    /// Highest placeholder index referenced.
    pub num_inputs: usize,
    /// The raw options.
    pub with_opts: WithOptions,
}

struct Conditions {
    id: Option<Literal>,
    pk_paths: Vec<String>,
    pk_values: Vec<Literal>,
}

fn parse_conditions(raw: &str) -> Result<Conditions> {
    let mut conds = Conditions {
        id: None,
        pk_paths: Vec::new(),
        pk_values: Vec::new(),
    };
    let mut rest = raw.trim();
    loop {
        let caps = RE_CONDITION
            .captures(rest)
            .ok_or_else(|| ParseError::unexpected("<field>=<value>", rest, Default::default()))?;
        let field = caps[1].to_string();
        let (value, remainder) = parse_value_or_word(&rest[caps[0].len()..], None)?;
        if field.eq_ignore_ascii_case("id") {
            if conds.id.replace(value).is_some() {
                return Err(CoreError::validation("id is specified more than once"));
            }
        } else {
            conds.pk_paths.push(format!("/{field}"));
            conds.pk_values.push(value);
        }

        rest = remainder.trim_start();
        if rest.is_empty() {
            return Ok(conds);
        }
        rest = match RE_AND.find(rest) {
            Some(m) => &rest[m.end()..],
            None => {
                return Err(
                    ParseError::unexpected("AND or end of WHERE clause", rest, Default::default())
                        .into(),
                )
            }
        };
    }
}

impl Delete {
    /// Parses the statement, filling in `default_db` when no database is named.
    pub fn parse(input: &str, default_db: &str) -> Result<Self> {
        let caps = RE_DELETE
            .captures(input)
            .ok_or_else(|| ParseError::unrecognized("DELETE", input))?;
        let with_opts = WithOptions::parse(caps.get(4).map_or("", |m| m.as_str()))?;
        with_opts.accept_only("DELETE", &SINGLE_PK_KEYS)?;
        with_opts.only_one_of(SINGLE_PK_KEYS[0], SINGLE_PK_KEYS[1])?;

        let conds = parse_conditions(&caps[3])?;
        let id = conds
            .id
            .ok_or_else(|| CoreError::validation("WHERE clause must specify id"))?;

        let pk_source = if !conds.pk_paths.is_empty() {
            PkSource::Explicit(conds.pk_paths)
        } else {
            PkSource::from_options(&with_opts)?
        };
        let num_inputs = max_placeholder(conds.pk_values.iter().chain(std::iter::once(&id)));

        let stmt = Self {
            db_name: db_or_default(caps.get(1).map(|m| m.as_str()), default_db),
            coll_name: caps[2].to_string(),
            id,
            pk_values: conds.pk_values,
            pk_source,
            num_inputs,
            with_opts,
        };
        stmt.validate()?;
        Ok(stmt)
    }

    /// Checks cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        require_names(&self.db_name, Some(&self.coll_name))
    }
}
