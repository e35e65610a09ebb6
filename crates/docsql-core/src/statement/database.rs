//! Database management statements.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::{require_names, Throughput};
use crate::error::{CoreError, Result};
use crate::options::{WithOptions, WITH_SUFFIX};
use crate::parser::ParseError;

static RE_CREATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)^CREATE\s+DATABASE(\s+IF\s+NOT\s+EXISTS)?\s+([\w\-]+){WITH_SUFFIX}\s*$"
    ))
    .expect("valid regex")
});
static RE_ALTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?is)^ALTER\s+DATABASE\s+([\w\-]+){WITH_SUFFIX}\s*$"))
        .expect("valid regex")
});
static RE_DROP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^DROP\s+DATABASE(\s+IF\s+EXISTS)?\s+([\w\-]+)\s*$").expect("valid regex")
});
static RE_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^LIST\s+DATABASES?\s*$").expect("valid regex"));

/// `CREATE DATABASE [IF NOT EXISTS] <db> [WITH RU|MAXRU=n]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateDatabase {
    /// Database name.
    pub db_name: String,
    /// Whether an existing database is tolerated.
    pub if_not_exists: bool,
    /// Shared throughput, if any.
    pub throughput: Option<Throughput>,
}

impl CreateDatabase {
    /// Parses the statement.
    pub fn parse(input: &str) -> Result<Self> {
        let caps = RE_CREATE
            .captures(input)
            .ok_or_else(|| ParseError::unrecognized("CREATE DATABASE", input))?;
        let with_opts = WithOptions::parse(caps.get(3).map_or("", |m| m.as_str()))?;
        with_opts.accept_only("CREATE DATABASE", &["RU", "MAXRU"])?;
        Ok(Self {
            db_name: caps[2].to_string(),
            if_not_exists: caps.get(1).is_some(),
            throughput: Throughput::from_options(&with_opts)?,
        })
    }
}

/// `ALTER DATABASE <db> WITH RU|MAXRU=n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlterDatabase {
    /// Database name.
    pub db_name: String,
    /// New shared throughput.
    pub throughput: Throughput,
}

impl AlterDatabase {
    /// Parses the statement.
    pub fn parse(input: &str) -> Result<Self> {
        let caps = RE_ALTER
            .captures(input)
            .ok_or_else(|| ParseError::unrecognized("ALTER DATABASE", input))?;
        let with_opts = WithOptions::parse(caps.get(2).map_or("", |m| m.as_str()))?;
        with_opts.accept_only("ALTER DATABASE", &["RU", "MAXRU"])?;
        let throughput = Throughput::from_options(&with_opts)?
            .ok_or_else(|| CoreError::validation("one of RU or MAXRU must be specified"))?;
        let stmt = Self {
            db_name: caps[1].to_string(),
            throughput,
        };
        require_names(&stmt.db_name, None)?;
        Ok(stmt)
    }
}

/// `DROP DATABASE [IF EXISTS] <db>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropDatabase {
    /// Database name.
    pub db_name: String,
    /// Whether a missing database is tolerated.
    pub if_exists: bool,
}

impl DropDatabase {
    /// Parses the statement.
    pub fn parse(input: &str) -> Result<Self> {
        let caps = RE_DROP
            .captures(input)
            .ok_or_else(|| ParseError::unrecognized("DROP DATABASE", input))?;
        Ok(Self {
            db_name: caps[2].to_string(),
            if_exists: caps.get(1).is_some(),
        })
    }
}

/// `LIST DATABASES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListDatabases;

impl ListDatabases {
    /// Parses the statement.
    pub fn parse(input: &str) -> Result<Self> {
        if RE_LIST.is_match(input) {
            Ok(Self)
        } else {
            Err(ParseError::unrecognized("LIST DATABASES", input).into())
        }
    }
}
