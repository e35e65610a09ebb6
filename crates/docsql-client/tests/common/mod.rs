#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use docsql_client::{
    BoxFuture, ClientConfig, CollectionSpec, Connection, DocRef, Document, DocumentSpec, PkRange,
    QueryPage, QueryRequest, ResourceType, RestClient, RestError, RestResult,
};
use docsql_core::{QueryPlan, Throughput};
use serde_json::{json, Value as JsonValue};

pub const DB: &str = "db";

/// A document with the partition key values it was stored under.
#[derive(Debug, Clone)]
struct Stored {
    pk_values: Vec<JsonValue>,
    body: Document,
}

impl Stored {
    fn id(&self) -> Option<&str> {
        self.body.get("id").and_then(JsonValue::as_str)
    }
}

#[derive(Debug, Default)]
struct Collection {
    pk_paths: Vec<String>,
    unique_keys: Vec<Vec<String>>,
    throughput: Option<Throughput>,
    docs: Vec<Stored>,
    partitions: Vec<Vec<JsonValue>>,
    rewritten: bool,
    backend_plan: Option<QueryPlan>,
}

#[derive(Debug, Default)]
struct Database {
    throughput: Option<Throughput>,
    collections: BTreeMap<String, Collection>,
}

/// In-memory stand-in for the document store's REST interface.
///
/// Documents are kept per collection. Queries do not evaluate SQL: each
/// partition key range serves the rows seeded with [`MemoryStore::seed_partitions`],
/// paged by `max_item_count` with the row offset as continuation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    databases: Mutex<BTreeMap<String, Database>>,
    queries: Mutex<Vec<QueryRequest>>,
    pk_lookups: AtomicUsize,
    counter: AtomicUsize,
    concurrent_writer: AtomicBool,
}

fn document_not_found() -> RestError {
    RestError::new(
        404,
        "Entity with the specified id does not exist in the system. ResourceType: Document",
    )
}

fn database_not_found(db: &str) -> RestError {
    RestError::new(404, format!("Database {db} does not exist"))
        .with_resource_type(ResourceType::Database)
}

fn collection_not_found(coll: &str) -> RestError {
    RestError::new(404, format!("Collection {coll} does not exist"))
        .with_resource_type(ResourceType::Collection)
}

fn ready<'a, T: Send + 'a>(value: T) -> BoxFuture<'a, T> {
    Box::pin(std::future::ready(value))
}

fn pointer(doc: &Document, path: &str) -> Option<JsonValue> {
    JsonValue::Object(doc.clone()).pointer(path).cloned()
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A store holding database [`DB`] with one collection.
    pub fn with_collection(coll: &str, pk_paths: &[&str]) -> Arc<Self> {
        let store = Self::new();
        store.add_collection(DB, coll, pk_paths, &[]);
        store
    }

    pub fn add_collection(&self, db: &str, coll: &str, pk_paths: &[&str], unique_keys: &[&[&str]]) {
        let mut dbs = self.databases.lock().unwrap();
        let database = dbs.entry(db.to_string()).or_default();
        database.collections.insert(
            coll.to_string(),
            Collection {
                pk_paths: pk_paths.iter().map(|p| (*p).to_string()).collect(),
                unique_keys: unique_keys
                    .iter()
                    .map(|uk| uk.iter().map(|p| (*p).to_string()).collect())
                    .collect(),
                ..Collection::default()
            },
        );
    }

    /// Sets the rows each partition key range serves to queries.
    pub fn seed_partitions(&self, coll: &str, partitions: Vec<Vec<JsonValue>>) {
        self.with_coll(coll, |c| c.partitions = partitions);
    }

    /// Makes partitions answer in the rewritten `orderByItems` / `groupByItems` shape.
    pub fn set_rewritten(&self, coll: &str) {
        self.with_coll(coll, |c| c.rewritten = true);
    }

    /// Attaches a backend query plan to every page.
    pub fn set_backend_plan(&self, coll: &str, plan: QueryPlan) {
        self.with_coll(coll, |c| c.backend_plan = Some(plan));
    }

    pub fn documents(&self, coll: &str) -> Vec<Document> {
        let mut out = Vec::new();
        self.with_coll(coll, |c| out = c.docs.iter().map(|d| d.body.clone()).collect());
        out
    }

    pub fn document(&self, coll: &str, id: &str) -> Option<Document> {
        self.documents(coll)
            .into_iter()
            .find(|d| d.get("id").and_then(JsonValue::as_str) == Some(id))
    }

    pub fn pk_values_of(&self, coll: &str, id: &str) -> Option<Vec<JsonValue>> {
        let mut out = None;
        self.with_coll(coll, |c| {
            out = c
                .docs
                .iter()
                .find(|d| d.id() == Some(id))
                .map(|d| d.pk_values.clone());
        });
        out
    }

    pub fn database_names(&self) -> Vec<String> {
        self.databases.lock().unwrap().keys().cloned().collect()
    }

    pub fn collection_names(&self, db: &str) -> Vec<String> {
        self.databases
            .lock()
            .unwrap()
            .get(db)
            .map(|d| d.collections.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn database_throughput(&self, db: &str) -> Option<Throughput> {
        self.databases.lock().unwrap().get(db)?.throughput
    }

    pub fn collection_throughput(&self, db: &str, coll: &str) -> Option<Throughput> {
        self.databases.lock().unwrap().get(db)?.collections.get(coll)?.throughput
    }

    pub fn collection_pk_paths(&self, db: &str, coll: &str) -> Option<Vec<String>> {
        Some(self.databases.lock().unwrap().get(db)?.collections.get(coll)?.pk_paths.clone())
    }

    /// Requests received by `query_documents`, in order.
    pub fn queries(&self) -> Vec<QueryRequest> {
        self.queries.lock().unwrap().clone()
    }

    /// After every document read, another writer changes the document's
    /// ETag, so a replace based on that read fails its precondition.
    pub fn race_document_reads(&self) {
        self.concurrent_writer.store(true, Ordering::SeqCst);
    }

    /// Number of partition key path lookups served.
    pub fn pk_lookups(&self) -> usize {
        self.pk_lookups.load(Ordering::SeqCst)
    }

    fn with_coll(&self, coll: &str, f: impl FnOnce(&mut Collection)) {
        let mut dbs = self.databases.lock().unwrap();
        let c = dbs
            .get_mut(DB)
            .and_then(|d| d.collections.get_mut(coll))
            .unwrap_or_else(|| panic!("no collection {coll}"));
        f(c);
    }

    fn collection<T>(
        &self,
        db: &str,
        coll: &str,
        f: impl FnOnce(&mut Collection) -> RestResult<T>,
    ) -> RestResult<T> {
        let mut dbs = self.databases.lock().unwrap();
        let database = dbs.get_mut(db).ok_or_else(|| database_not_found(db))?;
        let collection = database
            .collections
            .get_mut(coll)
            .ok_or_else(|| collection_not_found(coll))?;
        f(collection)
    }

    fn next_version(&self) -> usize {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn stamp(&self, mut body: Document) -> Document {
        let n = self.next_version();
        body.insert("_rid".into(), json!(format!("rid-{n}")));
        body.insert("_etag".into(), json!(format!("\"etag-{n}\"")));
        body.insert("_ts".into(), json!(n));
        body.insert("_self".into(), json!(format!("docs/rid-{n}")));
        body
    }
}

fn unique_key_conflict(coll: &Collection, candidate: &Stored) -> bool {
    coll.docs.iter().any(|other| {
        other.id() != candidate.id()
            && other.pk_values == candidate.pk_values
            && coll.unique_keys.iter().any(|uk| {
                uk.iter()
                    .all(|path| pointer(&other.body, path) == pointer(&candidate.body, path))
            })
    })
}

fn conflict() -> RestError {
    RestError::new(409, "Unique index constraint violation.")
}

impl RestClient for MemoryStore {
    fn get_collection_pk_paths<'a>(
        &'a self,
        db_name: &'a str,
        coll_name: &'a str,
    ) -> BoxFuture<'a, RestResult<Vec<String>>> {
        self.pk_lookups.fetch_add(1, Ordering::SeqCst);
        ready(self.collection(db_name, coll_name, |c| Ok(c.pk_paths.clone())))
    }

    fn list_pk_ranges<'a>(
        &'a self,
        db_name: &'a str,
        coll_name: &'a str,
    ) -> BoxFuture<'a, RestResult<Vec<PkRange>>> {
        ready(self.collection(db_name, coll_name, |c| {
            Ok((0..c.partitions.len().max(1))
                .map(|i| PkRange::new(i.to_string()))
                .collect())
        }))
    }

    fn create_document<'a>(&'a self, spec: &'a DocumentSpec) -> BoxFuture<'a, RestResult<Document>> {
        let body = self.stamp(spec.document.clone());
        ready(self.collection(&spec.db_name, &spec.coll_name, |c| {
            let candidate = Stored {
                pk_values: spec.pk_values.clone(),
                body,
            };
            let existing = c
                .docs
                .iter()
                .position(|d| d.pk_values == candidate.pk_values && d.id() == candidate.id());
            if existing.is_some() && !spec.is_upsert {
                return Err(RestError::new(
                    409,
                    "Entity with the specified id already exists in the system.",
                ));
            }
            if unique_key_conflict(c, &candidate) {
                return Err(conflict());
            }
            let stored = candidate.body.clone();
            match existing {
                Some(i) => c.docs[i] = candidate,
                None => c.docs.push(candidate),
            }
            Ok(stored)
        }))
    }

    fn get_document<'a>(&'a self, doc: &'a DocRef) -> BoxFuture<'a, RestResult<Document>> {
        let newer_etag = self
            .concurrent_writer
            .load(Ordering::SeqCst)
            .then(|| json!(format!("\"etag-{}\"", self.next_version())));
        ready(self.collection(&doc.db_name, &doc.coll_name, |c| {
            let stored = c
                .docs
                .iter_mut()
                .find(|d| d.pk_values == doc.pk_values && d.id() == Some(doc.id.as_str()))
                .ok_or_else(document_not_found)?;
            let read = stored.body.clone();
            if let Some(etag) = newer_etag {
                stored.body.insert("_etag".into(), etag);
            }
            Ok(read)
        }))
    }

    fn replace_document<'a>(
        &'a self,
        etag: &'a str,
        spec: &'a DocumentSpec,
    ) -> BoxFuture<'a, RestResult<Document>> {
        let body = self.stamp(spec.document.clone());
        ready(self.collection(&spec.db_name, &spec.coll_name, |c| {
            let candidate = Stored {
                pk_values: spec.pk_values.clone(),
                body,
            };
            let i = c
                .docs
                .iter()
                .position(|d| d.pk_values == candidate.pk_values && d.id() == candidate.id())
                .ok_or_else(document_not_found)?;
            if c.docs[i].body.get("_etag").and_then(JsonValue::as_str) != Some(etag) {
                return Err(RestError::new(
                    412,
                    "Operation cannot be performed because one of the specified precondition is not met.",
                ));
            }
            if unique_key_conflict(c, &candidate) {
                return Err(conflict());
            }
            let stored = candidate.body.clone();
            c.docs[i] = candidate;
            Ok(stored)
        }))
    }

    fn delete_document<'a>(&'a self, doc: &'a DocRef) -> BoxFuture<'a, RestResult<()>> {
        ready(self.collection(&doc.db_name, &doc.coll_name, |c| {
            let i = c
                .docs
                .iter()
                .position(|d| d.pk_values == doc.pk_values && d.id() == Some(doc.id.as_str()))
                .ok_or_else(document_not_found)?;
            c.docs.remove(i);
            Ok(())
        }))
    }

    fn query_documents<'a>(&'a self, req: &'a QueryRequest) -> BoxFuture<'a, RestResult<QueryPage>> {
        self.queries.lock().unwrap().push(req.clone());
        ready(self.collection(&req.db_name, &req.coll_name, |c| {
            let rows = match &req.range_id {
                Some(id) => {
                    let i: usize = id
                        .parse()
                        .map_err(|_| RestError::new(400, format!("bad range id {id}")))?;
                    c.partitions.get(i).cloned().unwrap_or_default()
                }
                None => c.partitions.concat(),
            };
            let start: usize = match &req.continuation {
                Some(token) => token
                    .parse()
                    .map_err(|_| RestError::new(400, format!("bad continuation {token}")))?,
                None => 0,
            };
            let start = start.min(rows.len());
            let end = match usize::try_from(req.max_item_count) {
                Ok(n) if n > 0 => (start + n).min(rows.len()),
                _ => rows.len(),
            };
            let slice = rows[start..end].to_vec();
            let continuation = (end < rows.len()).then(|| end.to_string());
            let mut page = if c.rewritten {
                QueryPage {
                    count: slice.len(),
                    rewritten_documents: Some(slice),
                    continuation,
                    ..QueryPage::default()
                }
            } else {
                QueryPage::new(slice, continuation)
            };
            page.query_plan = c.backend_plan.clone();
            Ok(page)
        }))
    }

    fn create_database<'a>(
        &'a self,
        db_name: &'a str,
        throughput: Option<Throughput>,
    ) -> BoxFuture<'a, RestResult<()>> {
        let mut dbs = self.databases.lock().unwrap();
        let result = if dbs.contains_key(db_name) {
            Err(RestError::new(409, format!("Database {db_name} already exists"))
                .with_resource_type(ResourceType::Database))
        } else {
            dbs.insert(
                db_name.to_string(),
                Database {
                    throughput,
                    ..Database::default()
                },
            );
            Ok(())
        };
        ready(result)
    }

    fn replace_database_offer<'a>(
        &'a self,
        db_name: &'a str,
        throughput: Throughput,
    ) -> BoxFuture<'a, RestResult<()>> {
        let mut dbs = self.databases.lock().unwrap();
        let result = match dbs.get_mut(db_name) {
            Some(d) => {
                d.throughput = Some(throughput);
                Ok(())
            }
            None => Err(database_not_found(db_name)),
        };
        ready(result)
    }

    fn delete_database<'a>(&'a self, db_name: &'a str) -> BoxFuture<'a, RestResult<()>> {
        let removed = self.databases.lock().unwrap().remove(db_name);
        ready(removed.map(|_| ()).ok_or_else(|| database_not_found(db_name)))
    }

    fn list_databases(&self) -> BoxFuture<'_, RestResult<Vec<JsonValue>>> {
        let names = self.database_names();
        ready(Ok(names.into_iter().map(|id| json!({ "id": id })).collect()))
    }

    fn create_collection<'a>(&'a self, spec: &'a CollectionSpec) -> BoxFuture<'a, RestResult<()>> {
        let mut dbs = self.databases.lock().unwrap();
        let result = match dbs.get_mut(&spec.db_name) {
            None => Err(database_not_found(&spec.db_name)),
            Some(d) if d.collections.contains_key(&spec.coll_name) => Err(RestError::new(
                409,
                format!("Collection {} already exists", spec.coll_name),
            )
            .with_resource_type(ResourceType::Collection)),
            Some(d) => {
                d.collections.insert(
                    spec.coll_name.clone(),
                    Collection {
                        pk_paths: spec.pk_paths.clone(),
                        unique_keys: spec.unique_keys.clone(),
                        throughput: spec.throughput,
                        ..Collection::default()
                    },
                );
                Ok(())
            }
        };
        ready(result)
    }

    fn replace_collection_offer<'a>(
        &'a self,
        db_name: &'a str,
        coll_name: &'a str,
        throughput: Throughput,
    ) -> BoxFuture<'a, RestResult<()>> {
        ready(self.collection(db_name, coll_name, |c| {
            c.throughput = Some(throughput);
            Ok(())
        }))
    }

    fn delete_collection<'a>(
        &'a self,
        db_name: &'a str,
        coll_name: &'a str,
    ) -> BoxFuture<'a, RestResult<()>> {
        let mut dbs = self.databases.lock().unwrap();
        let result = match dbs.get_mut(db_name) {
            None => Err(database_not_found(db_name)),
            Some(d) => d
                .collections
                .remove(coll_name)
                .map(|_| ())
                .ok_or_else(|| collection_not_found(coll_name)),
        };
        ready(result)
    }

    fn list_collections<'a>(&'a self, db_name: &'a str) -> BoxFuture<'a, RestResult<Vec<JsonValue>>> {
        let dbs = self.databases.lock().unwrap();
        let result = dbs
            .get(db_name)
            .map(|d| {
                d.collections
                    .iter()
                    .map(|(id, c)| json!({ "id": id, "partitionKey": { "paths": c.pk_paths } }))
                    .collect()
            })
            .ok_or_else(|| database_not_found(db_name));
        ready(result)
    }
}

/// A connection over `store` with [`DB`] as default database.
pub fn connect(store: &Arc<MemoryStore>) -> Connection {
    connect_with(store, ClientConfig::new())
}

pub fn connect_with(store: &Arc<MemoryStore>, config: ClientConfig) -> Connection {
    let client: Arc<dyn RestClient> = Arc::clone(store) as Arc<dyn RestClient>;
    Connection::new(client, config.with_default_db(DB))
}

/// Drains a SELECT page by page, returning every row and the number of pages.
pub async fn query_all(
    conn: &Connection,
    sql: &str,
    args: &[JsonValue],
    max_item_count: i64,
) -> (Vec<JsonValue>, usize) {
    let stmt = conn.prepare(sql).unwrap();
    let mut rows = Vec::new();
    let mut pages = 0;
    let mut options = docsql_client::QueryOptions::new().max_item_count(max_item_count);
    loop {
        let page = stmt.query_with(args, options.clone()).await.unwrap();
        if let Ok(cap) = usize::try_from(max_item_count) {
            assert!(page.len() <= cap, "page of {} rows over cap {cap}: {sql}", page.len());
        }
        pages += 1;
        rows.extend(page.rows);
        match page.continuation {
            Some(token) => options = options.continuation(token),
            None => return (rows, pages),
        }
        assert!(pages < 1000, "query did not terminate: {sql}");
    }
}
