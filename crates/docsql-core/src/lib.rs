//! # docsql-core
//!
//! A SQL dialect for partitioned document stores: statement parsing,
//! query-plan inference and cross-partition result merging. No I/O happens
//! in this crate.
//!
//! This crate provides:
//! - Parsers for collection and database DDL, `INSERT`/`UPSERT`, `UPDATE`,
//!   `DELETE` and `SELECT`, producing typed [`Statement`]s
//! - Inference of a [`QueryPlan`] from SELECT text
//! - A [`Merger`] that combines per-partition pages under that plan
//!
//! ## Parsing
//!
//! ```rust
//! use docsql_core::{parse_with_default_db, Statement};
//!
//! let stmt = parse_with_default_db("mydb", "DELETE FROM users WHERE id=$1 AND app=$2").unwrap();
//! let Statement::Delete(delete) = stmt else { unreachable!() };
//! assert_eq!(delete.db_name, "mydb");
//! assert_eq!(delete.num_inputs, 2);
//! ```
//!
//! ## Planning
//!
//! ```rust
//! use docsql_core::{QueryKind, QueryPlan};
//!
//! let plan = QueryPlan::infer("SELECT * FROM c ORDER BY c.age DESC", &[]).unwrap();
//! assert_eq!(plan.kind(), QueryKind::OrderBy);
//! ```

pub mod error;
pub mod lexer;
pub mod merge;
pub mod options;
pub mod parser;
pub mod plan;
pub mod statement;

pub use error::{CoreError, Result};
pub use lexer::{Lexer, Literal, Token, TokenKind};
pub use merge::{canonical_json, DistinctSet, GroupAccumulator, Merger, PartitionRows};
pub use options::WithOptions;
pub use parser::{parse, parse_with_default_db, ParseError, Parser};
pub use plan::{AggregateKind, DistinctKind, OrderByItem, QueryKind, QueryPlan};
pub use statement::{PkSource, QueryParam, Statement, Throughput};
