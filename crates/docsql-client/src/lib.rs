//! # docsql-client
//!
//! Executes [`docsql_core`] statements against a partitioned document store
//! reached through a [`RestClient`] implementation.
//!
//! This crate provides:
//! - [`Connection`] and [`PreparedStatement`] for running SQL text
//! - Write executors with partition key derivation and the deprecated
//!   trailing partition key argument convention
//! - Delegation of database and collection DDL with `IF [NOT] EXISTS` guards
//! - A [`QueryEngine`] that fans a SELECT out over partition key ranges,
//!   merges the pages and pages the result with a composite continuation
//!   token
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docsql_client::{ClientConfig, Connection, QueryOptions};
//! use serde_json::json;
//!
//! let conn = Connection::new(Arc::new(my_rest_client), ClientConfig::new().with_default_db("shop"));
//! conn.exec("INSERT INTO orders (id, customer) VALUES ($1, $2)", &[json!("o1"), json!("c9")]).await?;
//!
//! let rows = conn
//!     .query_with(
//!         "SELECT CROSS PARTITION * FROM orders ORDER BY orders.total DESC",
//!         &[],
//!         QueryOptions::new().max_item_count(50),
//!     )
//!     .await?;
//! ```

pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod exec;
pub mod pk;
pub mod rest;

pub use config::{ClientConfig, FanOut};
pub use connection::{Connection, PreparedStatement, QueryOptions, Rows, VALUE_COLUMN};
pub use engine::{QueryEngine, QueryResult};
pub use error::{Error, Result};
pub use exec::ExecResult;
pub use rest::{
    BoxFuture, CollectionSpec, DocRef, Document, DocumentSpec, PkRange, QueryPage, QueryRequest,
    ResourceType, RestClient, RestError, RestResult,
};
