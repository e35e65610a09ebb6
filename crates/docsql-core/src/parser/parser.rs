//! Statement dispatch.

use tracing::debug;

use super::error::ParseError;
use crate::error::Result;
use crate::statement::{
    AlterCollection, AlterDatabase, CreateCollection, CreateDatabase, Delete, DropCollection,
    DropDatabase, Insert, ListCollections, ListDatabases, Select, Statement, Update,
};

const SUPPORTED: &str =
    "CREATE, ALTER, DROP, LIST, INSERT, UPSERT, UPDATE, DELETE or SELECT";

/// Statement parser.
///
/// Holds the database used when a statement does not name one.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    default_db: String,
}

/// Object kind named by the second word of a DDL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Database,
    Collection,
}

fn target(word: &str) -> Option<Target> {
    match word {
        "DATABASE" | "DATABASES" => Some(Target::Database),
        "COLLECTION" | "COLLECTIONS" | "TABLE" | "TABLES" => Some(Target::Collection),
        _ => None,
    }
}

impl Parser {
    /// Creates a parser without a default database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parser that falls back to `default_db`.
    #[must_use]
    pub fn with_default_db(default_db: impl Into<String>) -> Self {
        Self {
            default_db: default_db.into(),
        }
    }

    /// Returns the default database, `""` when none.
    #[must_use]
    pub fn default_db(&self) -> &str {
        &self.default_db
    }

    /// Parses a single statement.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a recognized statement, or if a
    /// recognized statement fails validation.
    pub fn parse(&self, sql: &str) -> Result<Statement> {
        let sql = sql.trim();
        let mut words = sql.split_whitespace().map(str::to_ascii_uppercase);
        let first = words.next().unwrap_or_default();
        let second = words.next().unwrap_or_default();
        let db = self.default_db.as_str();
        debug!(verb = %first, object = %second, "parsing statement");

        let stmt = match (first.as_str(), target(&second)) {
            ("CREATE", Some(Target::Database)) => {
                Statement::CreateDatabase(CreateDatabase::parse(sql)?)
            }
            ("ALTER", Some(Target::Database)) => Statement::AlterDatabase(AlterDatabase::parse(sql)?),
            ("DROP", Some(Target::Database)) => Statement::DropDatabase(DropDatabase::parse(sql)?),
            ("LIST", Some(Target::Database)) => Statement::ListDatabases(ListDatabases::parse(sql)?),
            ("CREATE", Some(Target::Collection)) => {
                Statement::CreateCollection(CreateCollection::parse(sql, db)?)
            }
            ("ALTER", Some(Target::Collection)) => {
                Statement::AlterCollection(AlterCollection::parse(sql, db)?)
            }
            ("DROP", Some(Target::Collection)) => {
                Statement::DropCollection(DropCollection::parse(sql, db)?)
            }
            ("LIST", Some(Target::Collection)) => {
                Statement::ListCollections(ListCollections::parse(sql, db)?)
            }
            ("INSERT" | "UPSERT", _) => Statement::Insert(Insert::parse(sql, db)?),
            ("UPDATE", _) => Statement::Update(Update::parse(sql, db)?),
            ("DELETE", _) => Statement::Delete(Delete::parse(sql, db)?),
            ("SELECT", _) => Statement::Select(Select::parse(sql, db)?),
            _ => {
                let found: String = sql.chars().take(32).collect();
                return Err(ParseError::unexpected(
                    SUPPORTED,
                    found,
                    crate::lexer::Span::new(0, sql.len()),
                )
                .into());
            }
        };
        Ok(stmt)
    }
}

/// Parses a statement with no default database.
///
/// # Errors
///
/// See [`Parser::parse`].
pub fn parse(sql: &str) -> Result<Statement> {
    Parser::new().parse(sql)
}

/// Parses a statement, resolving unqualified names against `default_db`.
///
/// # Errors
///
/// See [`Parser::parse`].
pub fn parse_with_default_db(default_db: &str, sql: &str) -> Result<Statement> {
    Parser::with_default_db(default_db).parse(sql)
}
