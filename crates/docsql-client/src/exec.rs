//! Executors for statements that return no rows.

use docsql_core::statement::{Delete, Insert, Update};
use docsql_core::{Literal, Statement};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::pk::{derive_pk_values, PkArgs, PkCache, PkPaths};
use crate::rest::{
    etag_of, strip_system_attributes, CollectionSpec, DocRef, Document, DocumentSpec, RestClient,
    RestResult,
};

/// Outcome of a write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Number of documents or resources changed.
    pub rows_affected: u64,
    /// `_rid` of the document an INSERT or UPSERT wrote.
    pub last_insert_id: Option<String>,
}

impl ExecResult {
    /// A result with no insert id.
    #[must_use]
    pub const fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }
}

/// Looks up a JSON pointer such as `/a/b/0` in a document body.
pub(crate) fn pointer_in<'d>(doc: &'d Document, path: &str) -> Option<&'d JsonValue> {
    let mut segments = path
        .strip_prefix('/')?
        .split('/')
        .map(|s| s.replace("~1", "/").replace("~0", "~"));
    let mut current = doc.get(&segments.next()?)?;
    for segment in segments {
        current = match current {
            JsonValue::Object(map) => map.get(&segment)?,
            JsonValue::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Document ids are strings; any other value is rendered as JSON text.
fn id_string(value: JsonValue) -> String {
    match value {
        JsonValue::String(s) => s,
        other => other.to_string(),
    }
}

fn resolve_fields<'s>(
    pairs: impl Iterator<Item = (&'s str, &'s Literal)>,
    inputs: &[JsonValue],
) -> Result<Document> {
    pairs
        .map(|(field, value)| Ok((field.to_string(), value.resolve(inputs)?)))
        .collect()
}

/// Maps a document-level 404 to zero affected rows.
fn ignore_missing_document(result: RestResult<u64>) -> Result<ExecResult> {
    match result {
        Ok(n) => Ok(ExecResult::affected(n)),
        Err(err) if err.is_document_not_found() => {
            debug!(message = %err.message, "document not found, nothing to do");
            Ok(ExecResult::affected(0))
        }
        Err(err) => Err(err.into()),
    }
}

/// `INSERT` / `UPSERT`.
pub(crate) async fn insert(
    client: &dyn RestClient,
    stmt: &Insert,
    cache: &PkCache,
    args: &[JsonValue],
) -> Result<ExecResult> {
    let verb = if stmt.is_upsert { "UPSERT" } else { "INSERT" };
    let paths = cache
        .resolve(client, &stmt.db_name, &stmt.coll_name, &stmt.pk_source)
        .await?;
    let pk_args = PkArgs::dispatch(verb, args, stmt.num_inputs, paths.count())?;
    let document = resolve_fields(stmt.pairs(), pk_args.inputs())?;
    let pk_values = match pk_args {
        PkArgs::Trailing { pk_values, .. } => pk_values.to_vec(),
        PkArgs::Derived { .. } => derive_pk_values(paths, |path| pointer_in(&document, path).cloned())?,
    };

    let spec = DocumentSpec {
        db_name: stmt.db_name.clone(),
        coll_name: stmt.coll_name.clone(),
        is_upsert: stmt.is_upsert,
        pk_values,
        document,
    };
    let stored = client.create_document(&spec).await?;
    let rid = stored.get("_rid").and_then(JsonValue::as_str).map(String::from);
    debug!(verb, db = %spec.db_name, coll = %spec.coll_name, rid = ?rid, "document written");
    Ok(ExecResult {
        rows_affected: 1,
        last_insert_id: rid,
    })
}

/// `UPDATE`: read, overwrite the SET fields, replace under the read ETag.
pub(crate) async fn update(
    client: &dyn RestClient,
    stmt: &Update,
    cache: &PkCache,
    args: &[JsonValue],
) -> Result<ExecResult> {
    let paths = cache
        .resolve(client, &stmt.db_name, &stmt.coll_name, &stmt.pk_source)
        .await?;
    let pk_args = PkArgs::dispatch("UPDATE", args, stmt.num_inputs, paths.count())?;
    let inputs = pk_args.inputs();
    let id = id_string(stmt.id.resolve(inputs)?);
    let changes = resolve_fields(stmt.pairs(), inputs)?;
    let pk_values = match pk_args {
        PkArgs::Trailing { pk_values, .. } => pk_values.to_vec(),
        PkArgs::Derived { .. } => derive_pk_values(paths, |path| {
            pointer_in(&changes, path)
                .cloned()
                .or_else(|| (path == "/id").then(|| JsonValue::String(id.clone())))
        })?,
    };

    let doc_ref = DocRef {
        db_name: stmt.db_name.clone(),
        coll_name: stmt.coll_name.clone(),
        id,
        pk_values,
    };
    let current = match client.get_document(&doc_ref).await {
        Ok(doc) => doc,
        Err(err) => return ignore_missing_document(Err(err)),
    };
    let etag = etag_of(&current).to_string();
    let mut document = strip_system_attributes(current);
    document.extend(changes);

    let spec = DocumentSpec {
        db_name: doc_ref.db_name,
        coll_name: doc_ref.coll_name,
        is_upsert: false,
        pk_values: doc_ref.pk_values,
        document,
    };
    debug!(db = %spec.db_name, coll = %spec.coll_name, etag = %etag, "replacing document");
    ignore_missing_document(client.replace_document(&etag, &spec).await.map(|_| 1))
}

/// `DELETE`. Deleting a missing document is not an error.
pub(crate) async fn delete(
    client: &dyn RestClient,
    stmt: &Delete,
    cache: &PkCache,
    args: &[JsonValue],
) -> Result<ExecResult> {
    let paths = cache
        .resolve(client, &stmt.db_name, &stmt.coll_name, &stmt.pk_source)
        .await?;
    let pk_args = PkArgs::dispatch("DELETE", args, stmt.num_inputs, paths.count())?;
    let inputs = pk_args.inputs();
    let id = id_string(stmt.id.resolve(inputs)?);
    let pk_values = match pk_args {
        PkArgs::Trailing { pk_values, .. } => pk_values.to_vec(),
        PkArgs::Derived { .. } => {
            let where_values = match (&paths, &stmt.pk_source) {
                (PkPaths::Paths(named), docsql_core::PkSource::Explicit(_)) => named
                    .iter()
                    .zip(&stmt.pk_values)
                    .map(|(path, value)| Ok((path.as_str(), value.resolve(inputs)?)))
                    .collect::<Result<Vec<_>>>()?,
                _ => Vec::new(),
            };
            derive_pk_values(paths, |path| {
                where_values
                    .iter()
                    .find(|(p, _)| *p == path)
                    .map(|(_, v)| v.clone())
                    .or_else(|| (path == "/id").then(|| JsonValue::String(id.clone())))
            })?
        }
    };

    let doc_ref = DocRef {
        db_name: stmt.db_name.clone(),
        coll_name: stmt.coll_name.clone(),
        id,
        pk_values,
    };
    ignore_missing_document(client.delete_document(&doc_ref).await.map(|()| 1))
}

/// Applies an existence guard: `status` becomes zero affected rows when `guarded`.
fn guard(result: RestResult<()>, guarded: bool, status: u16) -> Result<ExecResult> {
    match result {
        Ok(()) => Ok(ExecResult::affected(1)),
        Err(err) if guarded && err.status == status => Ok(ExecResult::affected(0)),
        Err(err) => Err(err.into()),
    }
}

/// Database and collection DDL, delegated to the collaborator.
pub(crate) async fn ddl(client: &dyn RestClient, stmt: &Statement) -> Result<ExecResult> {
    info!(statement = stmt.name(), "delegating DDL");
    match stmt {
        Statement::CreateDatabase(s) => guard(
            client.create_database(&s.db_name, s.throughput).await,
            s.if_not_exists,
            409,
        ),
        Statement::AlterDatabase(s) => guard(
            client.replace_database_offer(&s.db_name, s.throughput).await,
            false,
            0,
        ),
        Statement::DropDatabase(s) => {
            guard(client.delete_database(&s.db_name).await, s.if_exists, 404)
        }
        Statement::CreateCollection(s) => {
            let spec = CollectionSpec {
                db_name: s.db_name.clone(),
                coll_name: s.coll_name.clone(),
                pk_paths: s.pk_paths().into_iter().map(String::from).collect(),
                large_pk: s.large_pk,
                unique_keys: s.unique_keys.clone(),
                throughput: s.throughput,
            };
            guard(client.create_collection(&spec).await, s.if_not_exists, 409)
        }
        Statement::AlterCollection(s) => guard(
            client
                .replace_collection_offer(&s.db_name, &s.coll_name, s.throughput)
                .await,
            false,
            0,
        ),
        Statement::DropCollection(s) => guard(
            client.delete_collection(&s.db_name, &s.coll_name).await,
            s.if_exists,
            404,
        ),
        other => Err(Error::OperationNotSupported(format!(
            "{} is not a DDL statement",
            other.name()
        ))),
    }
}
