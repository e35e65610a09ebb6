#![allow(dead_code)]

use docsql_core::statement::{
    AlterCollection, CreateCollection, Delete, DropCollection, Insert, ListCollections, Select,
    Update,
};
use docsql_core::{parse_with_default_db, CoreError, Literal, Statement};
use serde_json::Value as JsonValue;

pub fn parse(sql: &str) -> Statement {
    parse_db("", sql)
}

pub fn parse_db(default_db: &str, sql: &str) -> Statement {
    parse_with_default_db(default_db, sql)
        .unwrap_or_else(|e| panic!("Failed to parse: {sql}\nError: {e}"))
}

pub fn parse_err(sql: &str) -> CoreError {
    parse_db_err("", sql)
}

pub fn parse_db_err(default_db: &str, sql: &str) -> CoreError {
    match parse_with_default_db(default_db, sql) {
        Ok(stmt) => panic!("Expected parse error for: {sql}\nGot: {stmt:?}"),
        Err(e) => e,
    }
}

pub fn lit(value: JsonValue) -> Literal {
    Literal::from_json(value)
}

macro_rules! typed {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(default_db: &str, sql: &str) -> $ty {
            match parse_db(default_db, sql) {
                Statement::$variant(s) => s,
                other => panic!("Expected {}, got {other:?}", stringify!($variant)),
            }
        }
    };
}

typed!(create_collection, CreateCollection, CreateCollection);
typed!(alter_collection, AlterCollection, AlterCollection);
typed!(drop_collection, DropCollection, DropCollection);
typed!(list_collections, ListCollections, ListCollections);
typed!(insert, Insert, Insert);
typed!(update, Update, Update);
typed!(delete, Delete, Delete);
typed!(select, Select, Select);
