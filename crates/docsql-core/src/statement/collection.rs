//! Collection management statements.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::{db_or_default, require_names, split_pk_paths, QUALIFIED_NAME};
use crate::error::{CoreError, Result};
use crate::options::{WithOptions, WITH_SUFFIX};
use crate::parser::ParseError;

static RE_CREATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)^CREATE\s+(?:COLLECTION|TABLE)(\s+IF\s+NOT\s+EXISTS)?\s+{QUALIFIED_NAME}{WITH_SUFFIX}\s*$"
    ))
    .expect("valid regex")
});
static RE_ALTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)^ALTER\s+(?:COLLECTION|TABLE)\s+{QUALIFIED_NAME}{WITH_SUFFIX}\s*$"
    ))
    .expect("valid regex")
});
static RE_DROP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)^DROP\s+(?:COLLECTION|TABLE)(\s+IF\s+EXISTS)?\s+{QUALIFIED_NAME}\s*$"
    ))
    .expect("valid regex")
});
static RE_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^LIST\s+(?:COLLECTIONS?|TABLES?)(?:\s+FROM\s+([\w\-]+))?\s*$")
        .expect("valid regex")
});

/// Provisioned throughput, in request units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Throughput {
    /// Fixed throughput (`WITH RU=n`).
    Manual(u64),
    /// Autoscale maximum (`WITH MAXRU=n`).
    Autoscale(u64),
}

impl Throughput {
    /// Reads the mutually exclusive `RU` / `MAXRU` options.
    pub(crate) fn from_options(opts: &WithOptions) -> Result<Option<Self>> {
        opts.only_one_of("RU", "MAXRU")?;
        if let Some(ru) = opts.non_negative("RU")? {
            return Ok(Some(Self::Manual(ru)));
        }
        Ok(opts.non_negative("MAXRU")?.map(Self::Autoscale))
    }
}

/// Splits `/a:/b,/c/d;/e/f/g` into unique-key groups: `:` or `;` between
/// groups, `,` between the paths of one group.
fn parse_unique_keys(raw: &str) -> Result<Vec<Vec<String>>> {
    raw.split([';', ':'])
        .filter(|group| !group.trim().is_empty())
        .map(|group| {
            group
                .split(',')
                .map(|path| {
                    let path = path.trim();
                    if path.starts_with('/') && path.len() > 1 {
                        Ok(path.to_string())
                    } else {
                        Err(CoreError::validation(format!(
                            "invalid unique key path \"{path}\""
                        )))
                    }
                })
                .collect()
        })
        .collect()
}

/// `CREATE COLLECTION [IF NOT EXISTS] [<db>.]<coll> WITH PK=... [WITH ...]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateCollection {
    /// Database name.
    pub db_name: String,
    /// Collection name.
    pub coll_name: String,
    /// Whether an existing collection is tolerated.
    pub if_not_exists: bool,
    /// Partition-key paths as written, comma-separated for hierarchical keys.
    pub pk: String,
    /// Whether `LARGEPK` (the larger hash space) was requested.
    pub large_pk: bool,
    /// Provisioned throughput, if any.
    pub throughput: Option<Throughput>,
    /// Unique-key groups.
    pub unique_keys: Vec<Vec<String>>,
    /// The raw options.
    pub with_opts: WithOptions,
}

impl CreateCollection {
    /// Parses the statement, filling in `default_db` when no database is named.
    pub fn parse(input: &str, default_db: &str) -> Result<Self> {
        let caps = RE_CREATE
            .captures(input)
            .ok_or_else(|| ParseError::unrecognized("CREATE COLLECTION", input))?;
        let with_opts = WithOptions::parse(caps.get(4).map_or("", |m| m.as_str()))?;
        with_opts.accept_only("CREATE COLLECTION", &["PK", "LARGEPK", "RU", "MAXRU", "UK"])?;
        with_opts.only_one_of("PK", "LARGEPK")?;

        let (pk, large_pk) = match with_opts.get_any(&["PK", "LARGEPK"]) {
            Some((key, value)) => (value.to_string(), key == "LARGEPK"),
            None => {
                return Err(CoreError::validation(
                    "one of PK or LARGEPK must be specified",
                ))
            }
        };

        let stmt = Self {
            db_name: db_or_default(caps.get(2).map(|m| m.as_str()), default_db),
            coll_name: caps[3].to_string(),
            if_not_exists: caps.get(1).is_some(),
            pk,
            large_pk,
            throughput: Throughput::from_options(&with_opts)?,
            unique_keys: with_opts
                .get("UK")
                .map(parse_unique_keys)
                .transpose()?
                .unwrap_or_default(),
            with_opts,
        };
        stmt.validate()?;
        Ok(stmt)
    }

    /// Checks cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        require_names(&self.db_name, Some(&self.coll_name))?;
        split_pk_paths(&self.pk)?;
        Ok(())
    }

    /// The individual partition-key paths.
    #[must_use]
    pub fn pk_paths(&self) -> Vec<&str> {
        self.pk.split(',').map(str::trim).collect()
    }
}

/// `ALTER COLLECTION [<db>.]<coll> WITH RU|MAXRU=n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlterCollection {
    /// Database name.
    pub db_name: String,
    /// Collection name.
    pub coll_name: String,
    /// New throughput.
    pub throughput: Throughput,
    /// The raw options.
    pub with_opts: WithOptions,
}

impl AlterCollection {
    /// Parses the statement, filling in `default_db` when no database is named.
    pub fn parse(input: &str, default_db: &str) -> Result<Self> {
        let caps = RE_ALTER
            .captures(input)
            .ok_or_else(|| ParseError::unrecognized("ALTER COLLECTION", input))?;
        let with_opts = WithOptions::parse(caps.get(3).map_or("", |m| m.as_str()))?;
        with_opts.accept_only("ALTER COLLECTION", &["RU", "MAXRU"])?;
        let throughput = Throughput::from_options(&with_opts)?
            .ok_or_else(|| CoreError::validation("one of RU or MAXRU must be specified"))?;

        let stmt = Self {
            db_name: db_or_default(caps.get(1).map(|m| m.as_str()), default_db),
            coll_name: caps[2].to_string(),
            throughput,
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

/// `DROP COLLECTION [IF EXISTS] [<db>.]<coll>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropCollection {
    /// Database name.
    pub db_name: String,
    /// Collection name.
    pub coll_name: String,
    /// Whether a missing collection is tolerated.
    pub if_exists: bool,
}

impl DropCollection {
    /// Parses the statement, filling in `default_db` when no database is named.
    pub fn parse(input: &str, default_db: &str) -> Result<Self> {
        let caps = RE_DROP
            .captures(input)
            .ok_or_else(|| ParseError::unrecognized("DROP COLLECTION", input))?;
        let stmt = Self {
            db_name: db_or_default(caps.get(2).map(|m| m.as_str()), default_db),
            coll_name: caps[3].to_string(),
            if_exists: caps.get(1).is_some(),
        };
        stmt.validate()?;
        Ok(stmt)
    }

    /// Checks cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        require_names(&self.db_name, Some(&self.coll_name))
    }
}

/// `LIST COLLECTIONS [FROM <db>]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListCollections {
    /// Database name.
    pub db_name: String,
}

impl ListCollections {
    /// Parses the statement, filling in `default_db` when no database is named.
    pub fn parse(input: &str, default_db: &str) -> Result<Self> {
        let caps = RE_LIST
            .captures(input)
            .ok_or_else(|| ParseError::unrecognized("LIST COLLECTIONS", input))?;
        let stmt = Self {
            db_name: db_or_default(caps.get(1).map(|m| m.as_str()), default_db),
        };
        stmt.validate()?;
        Ok(stmt)
    }

    /// Checks cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        require_names(&self.db_name, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_keys() {
        assert_eq!(
            parse_unique_keys("/a:/b,/c/d;/e/f/g").unwrap(),
            vec![
                vec!["/a".to_string()],
                vec!["/b".to_string(), "/c/d".to_string()],
                vec!["/e/f/g".to_string()],
            ]
        );
        assert!(parse_unique_keys("/a,b").is_err());
    }

    #[test]
    fn test_throughput() {
        let opts = WithOptions::parse("WITH maxru=4000").unwrap();
        assert_eq!(
            Throughput::from_options(&opts).unwrap(),
            Some(Throughput::Autoscale(4000))
        );
        let opts = WithOptions::parse("WITH ru=400 WITH maxru=4000").unwrap();
        assert!(Throughput::from_options(&opts).is_err());
    }

    #[test]
    fn test_create_hierarchical_pk() {
        let stmt =
            CreateCollection::parse("CREATE COLLECTION db.c WITH pk=/TenantId,/UserId", "")
                .unwrap();
        assert_eq!(stmt.pk, "/TenantId,/UserId");
        assert_eq!(stmt.pk_paths(), vec!["/TenantId", "/UserId"]);
        assert!(!stmt.large_pk);
    }
}
