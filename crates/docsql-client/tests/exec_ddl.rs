mod common;

use common::{connect, MemoryStore, DB};
use docsql_client::Error;
use docsql_core::Throughput;
use serde_json::json;

#[tokio::test]
async fn create_database_guarded() {
    let store = MemoryStore::new();
    let conn = connect(&store);

    let created = conn
        .exec("CREATE DATABASE shop WITH maxru=4000", &[])
        .await
        .unwrap();
    assert_eq!(created.rows_affected, 1);
    assert_eq!(store.database_throughput("shop"), Some(Throughput::Autoscale(4000)));

    let err = conn.exec("CREATE DATABASE shop", &[]).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)), "{err:?}");

    let guarded = conn
        .exec("CREATE DATABASE IF NOT EXISTS shop", &[])
        .await
        .unwrap();
    assert_eq!(guarded.rows_affected, 0);
}

#[tokio::test]
async fn alter_and_drop_database() {
    let store = MemoryStore::new();
    let conn = connect(&store);
    conn.exec("CREATE DATABASE shop", &[]).await.unwrap();

    conn.exec("ALTER DATABASE shop WITH ru=800", &[]).await.unwrap();
    assert_eq!(store.database_throughput("shop"), Some(Throughput::Manual(800)));

    assert_eq!(
        conn.exec("DROP DATABASE shop", &[]).await.unwrap().rows_affected,
        1
    );
    let err = conn.exec("DROP DATABASE shop", &[]).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "{err:?}");
    assert_eq!(
        conn.exec("DROP DATABASE IF EXISTS shop", &[])
            .await
            .unwrap()
            .rows_affected,
        0
    );
    let err = conn
        .exec("ALTER DATABASE shop WITH ru=400", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "{err:?}");
}

#[tokio::test]
async fn create_collection_passes_options() {
    let store = MemoryStore::new();
    let conn = connect(&store);
    conn.exec("CREATE DATABASE shop", &[]).await.unwrap();

    conn.exec(
        "CREATE COLLECTION shop.orders WITH pk=/tenant,/day WITH ru=400 WITH uk=/email",
        &[],
    )
    .await
    .unwrap();
    assert_eq!(
        store.collection_pk_paths("shop", "orders"),
        Some(vec!["/tenant".to_string(), "/day".to_string()])
    );
    assert_eq!(
        store.collection_throughput("shop", "orders"),
        Some(Throughput::Manual(400))
    );

    let again = conn
        .exec("CREATE COLLECTION IF NOT EXISTS shop.orders WITH pk=/id", &[])
        .await
        .unwrap();
    assert_eq!(again.rows_affected, 0);
    assert!(matches!(
        conn.exec("CREATE COLLECTION shop.orders WITH pk=/id", &[]).await,
        Err(Error::Conflict(_))
    ));
}

#[tokio::test]
async fn create_collection_in_missing_database() {
    let store = MemoryStore::new();
    let conn = connect(&store);
    let err = conn
        .exec("CREATE COLLECTION IF NOT EXISTS nowhere.c WITH pk=/id", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "{err:?}");
}

#[tokio::test]
async fn alter_and_drop_collection() {
    let store = MemoryStore::with_collection("users", &["/id"]);
    let conn = connect(&store);

    conn.exec("ALTER COLLECTION users WITH maxru=10000", &[])
        .await
        .unwrap();
    assert_eq!(
        store.collection_throughput(DB, "users"),
        Some(Throughput::Autoscale(10000))
    );

    assert_eq!(
        conn.exec("DROP COLLECTION users", &[]).await.unwrap().rows_affected,
        1
    );
    assert_eq!(
        conn.exec("DROP COLLECTION IF EXISTS users", &[])
            .await
            .unwrap()
            .rows_affected,
        0
    );
    assert!(matches!(
        conn.exec("DROP TABLE users", &[]).await,
        Err(Error::NotFound(_))
    ));
    assert!(store.collection_names(DB).is_empty());
}

#[tokio::test]
async fn list_databases_and_collections() {
    let store = MemoryStore::with_collection("users", &["/id"]);
    store.add_collection(DB, "orders", &["/tenant"], &[]);
    let conn = connect(&store);

    let dbs = conn.query("LIST DATABASES", &[]).await.unwrap();
    assert_eq!(dbs.rows, vec![json!({"id": DB})]);
    assert_eq!(dbs.columns, vec!["id"]);
    assert!(dbs.continuation.is_none());

    let colls = conn.query("LIST COLLECTIONS", &[]).await.unwrap();
    let ids: Vec<&str> = colls.rows.iter().filter_map(|r| r["id"].as_str()).collect();
    assert_eq!(ids, vec!["orders", "users"]);
    assert_eq!(colls.columns, vec!["id", "partitionKey"]);

    let err = conn.query("LIST TABLES FROM nowhere", &[]).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "{err:?}");
}
