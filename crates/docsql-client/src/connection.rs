//! Connections and prepared statements.

use std::collections::BTreeSet;
use std::sync::Arc;

use docsql_core::{Parser, Statement};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::config::ClientConfig;
use crate::engine::QueryEngine;
use crate::error::{Error, Result};
use crate::exec::{self, ExecResult};
use crate::pk::PkCache;
use crate::rest::{QueryRequest, RestClient};

/// Column name used for rows that are not objects (`SELECT VALUE ...`).
pub const VALUE_COLUMN: &str = "$1";

/// Rows returned by a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    /// Column names: the sorted union of object keys, or [`VALUE_COLUMN`].
    pub columns: Vec<String>,
    /// The rows.
    pub rows: Vec<JsonValue>,
    /// Token for the next page of a SELECT, if any.
    pub continuation: Option<String>,
}

impl Rows {
    /// Wraps rows, deriving their columns.
    #[must_use]
    pub fn new(rows: Vec<JsonValue>, continuation: Option<String>) -> Self {
        let columns = if rows.is_empty() {
            Vec::new()
        } else if rows.iter().all(JsonValue::is_object) {
            rows.iter()
                .filter_map(JsonValue::as_object)
                .flat_map(|row| row.keys().cloned())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        } else {
            vec![VALUE_COLUMN.to_string()]
        };
        Self {
            columns,
            rows,
            continuation,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Paging and targeting options for a SELECT.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Page size cap; the connection default when `None`.
    pub max_item_count: Option<i64>,
    /// Continuation from a previous page.
    pub continuation: Option<String>,
    /// Restrict to the partition holding this key.
    pub partition_key: Option<Vec<JsonValue>>,
    /// Restrict to this partition key range.
    pub range_id: Option<String>,
}

impl QueryOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size cap.
    #[must_use]
    pub const fn max_item_count(mut self, n: i64) -> Self {
        self.max_item_count = Some(n);
        self
    }

    /// Resumes from a continuation token.
    #[must_use]
    pub fn continuation(mut self, token: impl Into<String>) -> Self {
        self.continuation = Some(token.into());
        self
    }

    /// Targets one partition by key.
    #[must_use]
    pub fn partition_key(mut self, values: Vec<JsonValue>) -> Self {
        self.partition_key = Some(values);
        self
    }

    /// Targets one partition key range.
    #[must_use]
    pub fn range_id(mut self, id: impl Into<String>) -> Self {
        self.range_id = Some(id.into());
        self
    }
}

/// A handle on the document store.
#[derive(Clone)]
pub struct Connection {
    client: Arc<dyn RestClient>,
    config: ClientConfig,
    parser: Parser,
}

impl Connection {
    /// Creates a connection over `client`.
    pub fn new(client: Arc<dyn RestClient>, config: ClientConfig) -> Self {
        let parser = Parser::with_default_db(config.default_db());
        Self {
            client,
            config,
            parser,
        }
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Parses `sql` into a reusable statement.
    pub fn prepare(&self, sql: &str) -> Result<PreparedStatement> {
        let statement = self.parser.parse(sql)?;
        debug!(statement = statement.name(), inputs = statement.num_inputs(), "prepared");
        Ok(PreparedStatement {
            client: Arc::clone(&self.client),
            config: self.config.clone(),
            statement,
            pk: PkCache::new(),
        })
    }

    /// Prepares and executes a write or DDL statement.
    pub async fn exec(&self, sql: &str, args: &[JsonValue]) -> Result<ExecResult> {
        self.prepare(sql)?.exec(args).await
    }

    /// Prepares and runs a query with default options.
    pub async fn query(&self, sql: &str, args: &[JsonValue]) -> Result<Rows> {
        self.prepare(sql)?.query(args).await
    }

    /// Prepares and runs a SELECT with explicit paging options.
    pub async fn query_with(
        &self,
        select: &str,
        args: &[JsonValue],
        options: QueryOptions,
    ) -> Result<Rows> {
        self.prepare(select)?.query_with(args, options).await
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A parsed statement bound to a connection.
///
/// Holds the partition key path cache, so repeated executions look the
/// paths up once.
pub struct PreparedStatement {
    client: Arc<dyn RestClient>,
    config: ClientConfig,
    statement: Statement,
    pk: PkCache,
}

impl PreparedStatement {
    /// The parsed statement.
    #[must_use]
    pub const fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Number of placeholder arguments the statement expects.
    #[must_use]
    pub const fn num_inputs(&self) -> usize {
        self.statement.num_inputs()
    }

    /// Executes a write or DDL statement.
    ///
    /// # Errors
    ///
    /// [`Error::ExecNotSupported`] for SELECT and LIST statements.
    pub async fn exec(&self, args: &[JsonValue]) -> Result<ExecResult> {
        let client = self.client.as_ref();
        match &self.statement {
            Statement::Insert(s) => exec::insert(client, s, &self.pk, args).await,
            Statement::Update(s) => exec::update(client, s, &self.pk, args).await,
            Statement::Delete(s) => exec::delete(client, s, &self.pk, args).await,
            stmt if stmt.is_query() => Err(Error::ExecNotSupported),
            stmt => exec::ddl(client, stmt).await,
        }
    }

    /// Runs a query with default options.
    ///
    /// # Errors
    ///
    /// [`Error::QueryNotSupported`] for statements that return no rows.
    pub async fn query(&self, args: &[JsonValue]) -> Result<Rows> {
        self.query_with(args, QueryOptions::default()).await
    }

    /// Runs a query; paging options apply to SELECT only.
    pub async fn query_with(&self, args: &[JsonValue], options: QueryOptions) -> Result<Rows> {
        let client = self.client.as_ref();
        match &self.statement {
            Statement::Select(select) => {
                if args.len() != select.num_inputs {
                    return Err(Error::ArgumentCount {
                        expected: select.num_inputs,
                        got: args.len(),
                    });
                }
                let req = QueryRequest {
                    db_name: select.db_name.clone(),
                    coll_name: select.coll_name.clone(),
                    query: select.query.clone(),
                    params: select.parameters(args)?,
                    max_item_count: options
                        .max_item_count
                        .unwrap_or(self.config.default_max_item_count),
                    partition_key: options.partition_key,
                    range_id: options.range_id,
                    cross_partition: select.is_cross_partition,
                    continuation: options.continuation,
                };
                let result = QueryEngine::new(client, self.config.fan_out)
                    .query(&req)
                    .await?;
                Ok(Rows::new(result.rows, result.continuation))
            }
            Statement::ListDatabases(_) => {
                Ok(Rows::new(client.list_databases().await?, None))
            }
            Statement::ListCollections(s) => {
                Ok(Rows::new(client.list_collections(&s.db_name).await?, None))
            }
            _ => Err(Error::QueryNotSupported),
        }
    }
}

impl std::fmt::Debug for PreparedStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedStatement")
            .field("statement", &self.statement)
            .field("pk_resolved", &self.pk.is_resolved())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_columns_of_objects() {
        let rows = Rows::new(vec![json!({"b": 1, "a": 2}), json!({"c": 3, "a": 4})], None);
        assert_eq!(rows.columns, vec!["a", "b", "c"]);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_columns_of_values() {
        let rows = Rows::new(vec![json!(1), json!("x")], Some("t".into()));
        assert_eq!(rows.columns, vec![VALUE_COLUMN]);
        assert_eq!(rows.continuation.as_deref(), Some("t"));
        assert!(Rows::new(Vec::new(), None).columns.is_empty());
    }

    #[test]
    fn test_query_options_builder() {
        let options = QueryOptions::new()
            .max_item_count(5)
            .continuation("tok")
            .range_id("0");
        assert_eq!(options.max_item_count, Some(5));
        assert_eq!(options.continuation.as_deref(), Some("tok"));
        assert_eq!(options.range_id.as_deref(), Some("0"));
    }
}
