//! The REST collaborator the executors and the query engine talk to.
//!
//! Transport, signing and retries live behind [`RestClient`]; this crate
//! only sees typed requests and classified [`RestError`]s.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use docsql_core::{QueryParam, QueryPlan, Throughput};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

/// A boxed future for collaborator calls.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of a collaborator call.
pub type RestResult<T> = std::result::Result<T, RestError>;

/// A stored document, system attributes included.
pub type Document = Map<String, JsonValue>;

/// Attributes the store manages itself. They are stripped before a replace.
pub const SYSTEM_ATTRIBUTES: [&str; 5] = ["_rid", "_self", "_etag", "_attachments", "_ts"];

/// The kind of resource a failed call was about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    /// A database.
    Database,
    /// A collection.
    Collection,
    /// A document.
    Document,
    /// A throughput offer.
    Offer,
    /// A partition key range.
    PartitionKeyRange,
}

impl ResourceType {
    /// Maps the backend's resource name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "database" | "db" => Some(Self::Database),
            "collection" | "documentcollection" | "coll" => Some(Self::Collection),
            "document" | "doc" => Some(Self::Document),
            "offer" => Some(Self::Offer),
            "partitionkeyrange" | "pkrange" => Some(Self::PartitionKeyRange),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Database => "Database",
            Self::Collection => "Collection",
            Self::Document => "Document",
            Self::Offer => "Offer",
            Self::PartitionKeyRange => "PartitionKeyRange",
        };
        f.write_str(name)
    }
}

/// A failed collaborator call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("StatusCode={status}: {message}")]
pub struct RestError {
    /// HTTP status code.
    pub status: u16,
    /// The resource the error is about, when the collaborator knows it.
    pub resource_type: Option<ResourceType>,
    /// The backend's message.
    pub message: String,
}

impl RestError {
    /// Creates an error with no explicit resource type.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            resource_type: None,
            message: message.into(),
        }
    }

    /// Sets the resource type.
    #[must_use]
    pub fn with_resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = Some(resource_type);
        self
    }

    /// The resource type, falling back to a `ResourceType: X` marker in the message.
    #[must_use]
    pub fn resource(&self) -> Option<ResourceType> {
        self.resource_type.or_else(|| {
            let (_, rest) = self.message.split_once("ResourceType:")?;
            let name: String = rest
                .trim_start()
                .chars()
                .take_while(char::is_ascii_alphabetic)
                .collect();
            ResourceType::from_name(&name)
        })
    }

    /// A 404 about the document itself, not its database or collection.
    #[must_use]
    pub fn is_document_not_found(&self) -> bool {
        self.status == 404 && self.resource() == Some(ResourceType::Document)
    }
}

/// Addresses one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocRef {
    /// Database name.
    pub db_name: String,
    /// Collection name.
    pub coll_name: String,
    /// Document id.
    pub id: String,
    /// Partition key values, one per path.
    pub pk_values: Vec<JsonValue>,
}

/// A document to create, upsert or replace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSpec {
    /// Database name.
    pub db_name: String,
    /// Collection name.
    pub coll_name: String,
    /// Replace an existing document with the same id instead of failing.
    pub is_upsert: bool,
    /// Partition key values, one per path.
    pub pk_values: Vec<JsonValue>,
    /// Document body.
    pub document: Document,
}

/// A collection to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionSpec {
    /// Database name.
    pub db_name: String,
    /// Collection name.
    pub coll_name: String,
    /// Partition key paths.
    pub pk_paths: Vec<String>,
    /// Use the large partition key hash.
    pub large_pk: bool,
    /// Unique key groups.
    pub unique_keys: Vec<Vec<String>>,
    /// Provisioned throughput.
    pub throughput: Option<Throughput>,
}

/// One partition key range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PkRange {
    /// Range id.
    pub id: String,
    /// Lower bound of the hashed key space.
    #[serde(default)]
    pub min_inclusive: String,
    /// Upper bound of the hashed key space.
    #[serde(default)]
    pub max_exclusive: String,
}

impl PkRange {
    /// A range known only by its id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            min_inclusive: String::new(),
            max_exclusive: String::new(),
        }
    }
}

/// A document query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryRequest {
    /// Database name.
    pub db_name: String,
    /// Collection name.
    pub coll_name: String,
    /// Query text with `@_N` parameters.
    pub query: String,
    /// Bound parameters.
    pub params: Vec<QueryParam>,
    /// Page size cap, `-1` for none.
    pub max_item_count: i64,
    /// Restrict to the partition holding this key.
    pub partition_key: Option<Vec<JsonValue>>,
    /// Restrict to this partition key range.
    pub range_id: Option<String>,
    /// Whether the query may span partitions.
    pub cross_partition: bool,
    /// Continuation from a previous page.
    pub continuation: Option<String>,
}

impl QueryRequest {
    /// Whether the request targets one partition.
    #[must_use]
    pub const fn is_single_partition(&self) -> bool {
        !self.cross_partition || self.partition_key.is_some() || self.range_id.is_some()
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    /// Rows in the plain shape.
    pub documents: Vec<JsonValue>,
    /// Number of rows in this page.
    pub count: usize,
    /// Continuation for the next page, `None` when the partition is drained.
    pub continuation: Option<String>,
    /// The backend's plan for the query, when it sends one.
    pub query_plan: Option<QueryPlan>,
    /// Rows in the rewritten `orderByItems` / `groupByItems` shape.
    pub rewritten_documents: Option<Vec<JsonValue>>,
}

impl QueryPage {
    /// A page of plain rows.
    #[must_use]
    pub fn new(documents: Vec<JsonValue>, continuation: Option<String>) -> Self {
        Self {
            count: documents.len(),
            documents,
            continuation,
            query_plan: None,
            rewritten_documents: None,
        }
    }
}

/// The document store's REST interface.
///
/// Implementations own transport, authentication, timeouts and retries of
/// transient failures.
pub trait RestClient: Send + Sync {
    /// Partition key paths of a collection.
    fn get_collection_pk_paths<'a>(
        &'a self,
        db_name: &'a str,
        coll_name: &'a str,
    ) -> BoxFuture<'a, RestResult<Vec<String>>>;

    /// Current partition key ranges of a collection.
    fn list_pk_ranges<'a>(
        &'a self,
        db_name: &'a str,
        coll_name: &'a str,
    ) -> BoxFuture<'a, RestResult<Vec<PkRange>>>;

    /// Creates, or with `is_upsert` creates or replaces, a document.
    fn create_document<'a>(&'a self, spec: &'a DocumentSpec) -> BoxFuture<'a, RestResult<Document>>;

    /// Reads one document.
    fn get_document<'a>(&'a self, doc: &'a DocRef) -> BoxFuture<'a, RestResult<Document>>;

    /// Replaces a document if its current ETag is `etag`.
    fn replace_document<'a>(
        &'a self,
        etag: &'a str,
        spec: &'a DocumentSpec,
    ) -> BoxFuture<'a, RestResult<Document>>;

    /// Deletes one document.
    fn delete_document<'a>(&'a self, doc: &'a DocRef) -> BoxFuture<'a, RestResult<()>>;

    /// Runs a query and returns one page.
    fn query_documents<'a>(&'a self, req: &'a QueryRequest) -> BoxFuture<'a, RestResult<QueryPage>>;

    /// Creates a database.
    fn create_database<'a>(
        &'a self,
        db_name: &'a str,
        throughput: Option<Throughput>,
    ) -> BoxFuture<'a, RestResult<()>>;

    /// Changes a database's throughput.
    fn replace_database_offer<'a>(
        &'a self,
        db_name: &'a str,
        throughput: Throughput,
    ) -> BoxFuture<'a, RestResult<()>>;

    /// Deletes a database.
    fn delete_database<'a>(&'a self, db_name: &'a str) -> BoxFuture<'a, RestResult<()>>;

    /// Lists databases.
    fn list_databases(&self) -> BoxFuture<'_, RestResult<Vec<JsonValue>>>;

    /// Creates a collection.
    fn create_collection<'a>(&'a self, spec: &'a CollectionSpec) -> BoxFuture<'a, RestResult<()>>;

    /// Changes a collection's throughput.
    fn replace_collection_offer<'a>(
        &'a self,
        db_name: &'a str,
        coll_name: &'a str,
        throughput: Throughput,
    ) -> BoxFuture<'a, RestResult<()>>;

    /// Deletes a collection.
    fn delete_collection<'a>(
        &'a self,
        db_name: &'a str,
        coll_name: &'a str,
    ) -> BoxFuture<'a, RestResult<()>>;

    /// Lists the collections of a database.
    fn list_collections<'a>(&'a self, db_name: &'a str) -> BoxFuture<'a, RestResult<Vec<JsonValue>>>;
}

/// The ETag of a fetched document, empty if it has none.
#[must_use]
pub fn etag_of(doc: &Document) -> &str {
    doc.get("_etag").and_then(JsonValue::as_str).unwrap_or_default()
}

/// Removes the attributes the store manages.
#[must_use]
pub fn strip_system_attributes(mut doc: Document) -> Document {
    for attr in SYSTEM_ATTRIBUTES {
        doc.remove(attr);
    }
    doc
}
