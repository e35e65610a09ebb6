//! Tests for INSERT, UPSERT, UPDATE and DELETE.

mod common;
use common::*;

use docsql_core::{CoreError, Literal, PkSource};
use serde_json::json;

const QUOTED: &str = r#""\"a string 'with' \\\"quote\\\"\"""#;

// ===================================================================
// INSERT / UPSERT
// ===================================================================

#[test]
fn insert_errors() {
    for verb in ["INSERT", "UPSERT"] {
        for tail in [
            "INTO db (a,b,c) VALUES (1,2,3)",
            "INTO db.table (a,b,c)",
            "INTO db.table VALUES (1,2,3)",
            "INTO db.table (a) VALUES ('a string')",
            r#"INTO db.table (a) VALUES ("a string")"#,
            r#"INTO db.table (a) VALUES ("{key:value}")"#,
            "INTO db.table (a,b) VALUES (1,2,3)",
            "INTO db.table (a,b) VALUES (0x1qa,2)",
            r#"INTO db.table (a,b) VALUES ("cannot \\"unquote",2)"#,
            "INTO db.table (a,b) VALUES (1,2) WITH a",
            "INTO db.table (a,b,c) VALUES (1,2,@1) WITH singlePK, with SINGLE_PK",
            "INTO db.table (a,b,c) VALUES (1,2,3) WITH singlePK=false",
            "INTO db.table (a,b,c) VALUES (:1,$2,3) WITH SINGLE_PK=error",
            "INTO db.table (a,b,c) VALUES (:1,$2,3) WITH withPk=/mypk WITH SINGLE_PK",
            "INTO db.table (a,b,c) VALUES (:1,$2,3) WITH SINGLE_PK WITH pk=/mypk",
        ] {
            parse_err(&format!("{verb} {tail}"));
        }
    }
}

#[test]
fn insert_basic_values() {
    let sql = r#"INSERT INTO
db1.table1 (a, b, c, d, e,
f) VALUES
	(null, 1.0,
true, "\"a string 'with' \\\"quote\\\"\"", "{\"key\":\"value\"}", "[2.0,null,false,\"a string 'with' \\\"quote\\\"\"]")"#;
    let i = insert("", sql);
    assert_eq!(i.db_name, "db1");
    assert_eq!(i.coll_name, "table1");
    assert!(!i.is_upsert);
    assert_eq!(i.fields, vec!["a", "b", "c", "d", "e", "f"]);
    assert_eq!(
        i.values,
        vec![
            Literal::Null,
            lit(json!(1.0)),
            Literal::Bool(true),
            Literal::String("a string 'with' \"quote\"".into()),
            lit(json!({"key": "value"})),
            lit(json!([2.0, null, false, "a string 'with' \"quote\""])),
        ]
    );
    assert_eq!(i.num_inputs, 0);
    assert_eq!(i.pk_source, PkSource::Lookup);
}

#[test]
fn insert_placeholders() {
    let i = insert("", "INSERT \nINTO db-2.table_2 (\na,b,c) VALUES (\n$1, :3, @2)");
    assert_eq!(
        i.values,
        vec![
            Literal::Placeholder(1),
            Literal::Placeholder(3),
            Literal::Placeholder(2)
        ]
    );
    assert_eq!(i.num_inputs, 3);

    assert_eq!(insert("", "INSERT INTO db.table (a,b,c) VALUES (:1,$1,@1)").num_inputs, 1);
    assert_eq!(insert("", "INSERT INTO db.table (a,b,c) VALUES (1,2,$5)").num_inputs, 5);
}

#[test]
fn insert_single_pk_flags() {
    for suffix in ["WITH singlePK", "WITH SINGLE_PK", "WITH singlePK=true", "WITH SINGLE_PK=true"] {
        let i = insert("", &format!("INSERT INTO db.table (a,b,c) VALUES (:1,$2,3) {suffix}"));
        assert_eq!(i.pk_source, PkSource::SinglePath, "{suffix}");
        assert_eq!(i.num_inputs, 2);
    }
}

#[test]
fn insert_with_pk() {
    let i = insert("", "INSERT INTO db.table (a,b,c) VALUES (:1,$2,3) WITH withPk=/mypk");
    assert_eq!(i.pk_source, PkSource::Explicit(vec!["/mypk".into()]));
    let i = insert(
        "",
        "INSERT INTO db.table (a,b,c) VALUES (:1,$2,3) WITH PK=/TenantId,/UserId,/SessionId",
    );
    assert_eq!(i.pk_source.known_count(), Some(3));
}

#[test]
fn upsert_default_db() {
    for sql in [
        "UPSERT INTO .table (a,b) VALUES (1,2)",
        "UPSERT INTO db. (a,b) VALUES (1,2)",
        "UPSERT INTO table (a,b) VALUES (1,2) WITH a=1",
    ] {
        parse_db_err("mydb", sql);
    }
    let u = insert("mydb", "UPSERT INTO table1 (a,b) VALUES (1,$2)");
    assert!(u.is_upsert);
    assert_eq!(u.db_name, "mydb");
    assert_eq!(u.num_inputs, 2);
}

// ===================================================================
// UPDATE
// ===================================================================

#[test]
fn update_errors() {
    for sql in [
        "UPDATE db SET a=1,b=2,c=3 WHERE id=4",
        "UPDATE db.table SET a=1,b=2,c=3 WHERE username=4",
        "UPDATE db.table SET a=1,b=2,c=3",
        "UPDATE db.table WHERE id=1",
        "UPDATE db.table SET      WHERE id=1",
        r#"UPDATE db.table SET a="{key:value}" WHERE id=1"#,
        "UPDATE db.table SET =1 WHERE id=2",
        "UPDATE db.table SET a=1 WHERE id=   ",
        r#"UPDATE db.table SET a=1,b=2,c=3 WHERE id="4"#,
        "UPDATE db.table SET a=1,b=2,c=3 WHERE id=4 WITH a",
        "UPDATE db.table SET a=$1 WHERE id=@4 with SinglePk WITH SINGLE_PK",
        "UPDATE db.table SET a=$1 WHERE id=@4 WITH singlePK=false",
        "UPDATE db.table SET a=$1 WHERE id=@4 with Single_PK=error",
    ] {
        parse_err(sql);
    }
}

#[test]
fn update_multiline_set() {
    let sql = format!(
        "UPDATE db1.table1 \nSET a=null, b=\n\t1.0, c=true, \n  d={QUOTED}, e=\"{{\\\"key\\\":\\\"value\\\"}}\"\n,f=\"[2.0,null,false]\" WHERE\n\tid=\"abc\""
    );
    let u = update("", &sql);
    assert_eq!(u.fields, vec!["a", "b", "c", "d", "e", "f"]);
    assert_eq!(u.values[3], Literal::String("a string 'with' \"quote\"".into()));
    assert_eq!(u.values[4], lit(json!({"key": "value"})));
    assert_eq!(u.values[5], lit(json!([2.0, null, false])));
    assert_eq!(u.id, Literal::String("abc".into()));
    assert_eq!(u.num_inputs, 0);
}

#[test]
fn update_placeholders() {
    let u = update("", "UPDATE db-1.table_1 \nSET a=$1, b=\n\t$2, c=:3, d=0 WHERE\n\tid=@4");
    assert_eq!(u.id, Literal::Placeholder(4));
    assert_eq!(u.values[3], lit(json!(0)));
    assert_eq!(u.num_inputs, 4);

    let u = update("", "UPDATE db.table SET a=$1, b=$2 WHERE id=@4 with SinglePk");
    assert_eq!(u.pk_source, PkSource::SinglePath);
    assert_eq!(update("", "UPDATE db.table SET a=1 WHERE id=4").id, Literal::String("4".into()));
}

#[test]
fn update_default_db() {
    for sql in [
        "UPDATE .table SET a=1,b=2,c=3 WHERE id=4",
        "UPDATE db. SET a=1,b=2,c=3 WHERE id=4",
        "UPDATE table SET a=1,b=2,c=3 WHERE id=4 WITH a=1",
    ] {
        parse_db_err("mydb", sql);
    }
    let u = update("mydb", "UPDATE table1 SET a=1 WHERE id=x WITH pk=/a");
    assert_eq!(u.db_name, "mydb");
    assert_eq!(u.pk_source, PkSource::Explicit(vec!["/a".into()]));
}

// ===================================================================
// DELETE
// ===================================================================

#[test]
fn delete_errors() {
    for sql in [
        "DELETE FROM db WHERE id=1",
        "DELETE FROM db.table",
        "DELETE FROM db.table WHERE id=",
        r#"DELETE FROM db.table WHERE id="1"#,
        r#"DELETE FROM db.table WHERE id=2""#,
        "DELETE FROM db.table WHERE id=@1 a",
        "DELETE FROM db.table WHERE id=b $2",
        "DELETE FROM db.table WHERE id=c :3 d",
        "DELETE FROM db.table WHERE id=1 WITH a",
        "DELETE FROM db.table WHERE id=@2 with SinglePK WITH SINGLE_PK",
        "DELETE FROM db.table WHERE id=@2 WITH singlePK=false",
        "DELETE FROM db.table WHERE id=@2 with Single_PK=error",
        "DELETE FROM db.table WHERE app=1",
        "DELETE FROM db.table WHERE id=1 WITH pk=/a",
    ] {
        parse_err(sql);
    }
}

#[test]
fn delete_ids() {
    let d = delete("", "DELETE FROM \ndb1.table1 WHERE \n\tid=abc");
    assert_eq!(d.id, Literal::String("abc".into()));
    assert_eq!(d.pk_source, PkSource::Lookup);

    let d = delete("", "\n\t\t\tDELETE\n\t\tFROM db-2.table_2\n\t\t\tWHERE     id=\"\\\"def\\\"\"");
    assert_eq!(d.db_name, "db-2");
    assert_eq!(d.id, Literal::String("def".into()));

    let d = delete("", "DELETE FROM\n\t\tdb_3-0.table-3_0 WHERE\n\t\t\tid=@2");
    assert_eq!(d.id, Literal::Placeholder(2));
    assert_eq!(d.num_inputs, 2);

    assert_eq!(delete("", "DELETE FROM db.t WHERE id=1").id, lit(json!(1)));
}

#[test]
fn delete_single_pk() {
    for (sql, inputs) in [
        ("DELETE FROM db.table WHERE id=$1 WITH singlePK", 1),
        ("DELETE FROM db.table WHERE id=:3 with Single_PK", 3),
        ("DELETE FROM db.table WHERE id=:1 WITH singlePK=true", 1),
        ("DELETE FROM db.table WHERE id=@2 with Single_PK=True", 2),
    ] {
        let d = delete("", sql);
        assert_eq!(d.pk_source, PkSource::SinglePath, "{sql}");
        assert_eq!(d.num_inputs, inputs);
    }
}

#[test]
fn delete_where_pk_paths() {
    let d = delete("", "DELETE FROM db.table WHERE id=1 and withPk=abc");
    assert_eq!(d.pk_source, PkSource::Explicit(vec!["/withPk".into()]));
    assert_eq!(d.pk_values, vec![Literal::String("abc".into())]);

    let d = delete("", "DELETE FROM db.table WHERE id=:3 AND app=$2 and Username=1");
    assert_eq!(d.id, Literal::Placeholder(3));
    assert_eq!(
        d.pk_source,
        PkSource::Explicit(vec!["/app".into(), "/Username".into()])
    );
    assert_eq!(d.pk_values, vec![Literal::Placeholder(2), lit(json!(1))]);
    assert_eq!(d.num_inputs, 3);
}

#[test]
fn delete_default_db() {
    parse_err("DELETE FROM .table WHERE id=1");
    parse_err("DELETE FROM db. WHERE id=1");
    parse_db_err("mydb", "DELETE FROM table WHERE id=1 WITH a=1");
    assert_eq!(delete("mydb", "DELETE FROM table1 WHERE id=1").db_name, "mydb");
    assert_eq!(delete("mydb", "DELETE FROM db2.table1 WHERE id=1").db_name, "db2");
}

#[test]
fn error_messages_carry_offending_text() {
    let err = parse_err("INSERT INTO db.table (a) VALUES (bogus)");
    assert!(matches!(err, CoreError::Syntax(_)));
    assert!(err.to_string().contains("bogus"), "{err}");

    let err = parse_err("INSERT INTO db.table (a,b) VALUES (1,2) WITH x=1");
    assert_eq!(
        err,
        CoreError::UnknownOption {
            statement: "INSERT",
            key: "X".into()
        }
    );
}
