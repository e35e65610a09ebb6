//! Typed statements produced by the parser.

mod collection;
mod database;
mod delete;
mod insert;
mod select;
mod update;

use serde::Serialize;

pub use collection::{
    AlterCollection, CreateCollection, DropCollection, ListCollections, Throughput,
};
pub use database::{AlterDatabase, CreateDatabase, DropDatabase, ListDatabases};
pub use delete::Delete;
pub use insert::Insert;
pub use select::{QueryParam, Select};
pub use update::Update;

use crate::error::{CoreError, Result};
use crate::options::WithOptions;

/// `[<db>.]<name>` as a pair of regex groups.
pub(crate) const QUALIFIED_NAME: &str = r"(?:([\w\-]+)\.)?([\w\-]+)";

/// Option keys that request a single, positionally supplied partition key value.
pub const SINGLE_PK_KEYS: [&str; 2] = ["SINGLE_PK", "SINGLEPK"];

/// Where a document statement gets its partition-key paths from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "paths", rename_all = "snake_case")]
pub enum PkSource {
    /// Paths named by the statement itself (`WITH PK=` or a `DELETE` WHERE chain).
    Explicit(Vec<String>),
    /// Exactly one unnamed path whose value is passed positionally.
    SinglePath,
    /// Paths are fetched from collection metadata on first use.
    Lookup,
}

impl PkSource {
    /// Number of partition-key paths when known without a metadata lookup.
    #[must_use]
    pub fn known_count(&self) -> Option<usize> {
        match self {
            Self::Explicit(paths) => Some(paths.len()),
            Self::SinglePath => Some(1),
            Self::Lookup => None,
        }
    }

    /// Reads `PK` / `SINGLE_PK` / `SINGLEPK` from the options of a document statement.
    pub(crate) fn from_options(opts: &WithOptions) -> Result<Self> {
        opts.only_one_of("PK", "SINGLE_PK")?;
        opts.only_one_of("PK", "SINGLEPK")?;
        opts.only_one_of("SINGLE_PK", "SINGLEPK")?;
        if let Some(pk) = opts.get("PK") {
            return Ok(Self::Explicit(split_pk_paths(pk)?));
        }
        let single = SINGLE_PK_KEYS
            .iter()
            .map(|key| opts.flag(key))
            .collect::<Result<Vec<_>>>()?;
        if single.contains(&true) {
            Ok(Self::SinglePath)
        } else {
            Ok(Self::Lookup)
        }
    }
}

/// Splits a comma-separated list of partition-key paths, checking each one.
pub fn split_pk_paths(raw: &str) -> Result<Vec<String>> {
    if raw.trim().is_empty() {
        return Err(CoreError::validation("partition key path is missing"));
    }
    raw.split(',')
        .map(|path| {
            let path = path.trim();
            if path.len() < 2 || !path.starts_with('/') {
                return Err(CoreError::validation(format!(
                    "invalid partition key path \"{path}\" in \"{raw}\""
                )));
            }
            Ok(path.to_string())
        })
        .collect()
}

/// Picks the database named in the statement, else the default one.
pub(crate) fn db_or_default(explicit: Option<&str>, default_db: &str) -> String {
    explicit
        .filter(|db| !db.is_empty())
        .unwrap_or(default_db)
        .to_string()
}

/// Fails unless both names are non-empty.
pub(crate) fn require_names(db_name: &str, coll_name: Option<&str>) -> Result<()> {
    if db_name.is_empty() {
        return Err(CoreError::validation("database is missing"));
    }
    if coll_name.is_some_and(str::is_empty) {
        return Err(CoreError::validation("collection is missing"));
    }
    Ok(())
}

/// A parsed statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    /// `CREATE DATABASE`.
    CreateDatabase(CreateDatabase),
    /// `ALTER DATABASE`.
    AlterDatabase(AlterDatabase),
    /// `DROP DATABASE`.
    DropDatabase(DropDatabase),
    /// `LIST DATABASES`.
    ListDatabases(ListDatabases),
    /// `CREATE COLLECTION`.
    CreateCollection(CreateCollection),
    /// `ALTER COLLECTION`.
    AlterCollection(AlterCollection),
    /// `DROP COLLECTION`.
    DropCollection(DropCollection),
    /// `LIST COLLECTIONS`.
    ListCollections(ListCollections),
    /// `INSERT` / `UPSERT`.
    Insert(Insert),
    /// `UPDATE`.
    Update(Update),
    /// `DELETE`.
    Delete(Delete),
    /// `SELECT`.
    Select(Select),
}

impl Statement {
    /// Highest placeholder index the statement references.
    #[must_use]
    pub const fn num_inputs(&self) -> usize {
        match self {
            Self::Insert(s) => s.num_inputs,
            Self::Update(s) => s.num_inputs,
            Self::Delete(s) => s.num_inputs,
            Self::Select(s) => s.num_inputs,
            _ => 0,
        }
    }

    /// Returns true for statements that produce rows rather than a row count.
    #[must_use]
    pub const fn is_query(&self) -> bool {
        matches!(
            self,
            Self::Select(_) | Self::ListCollections(_) | Self::ListDatabases(_)
        )
    }

    /// Short name of the statement kind.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateDatabase(_) => "CREATE DATABASE",
            Self::AlterDatabase(_) => "ALTER DATABASE",
            Self::DropDatabase(_) => "DROP DATABASE",
            Self::ListDatabases(_) => "LIST DATABASES",
            Self::CreateCollection(_) => "CREATE COLLECTION",
            Self::AlterCollection(_) => "ALTER COLLECTION",
            Self::DropCollection(_) => "DROP COLLECTION",
            Self::ListCollections(_) => "LIST COLLECTIONS",
            Self::Insert(s) if s.is_upsert => "UPSERT",
            Self::Insert(_) => "INSERT",
            Self::Update(_) => "UPDATE",
            Self::Delete(_) => "DELETE",
            Self::Select(_) => "SELECT",
        }
    }
}
