#![cfg(feature = "sqlite")]

use sql_transact::prelude::*;
use tempfile::tempdir;

fn unique_db_path(prefix: &str) -> String {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(format!("{prefix}.db"));
    // Leak the tempdir so the file persists for the duration of the test binary.
    std::mem::forget(dir);
    path.to_string_lossy().into_owned()
}

fn setup(path: &str) -> SqlTransact {
    let conn = SqliteConnection::open(path).unwrap();
    let mut db = SqlTransact::new(SingleConnectionProvider::new(Box::new(conn)));
    let ddl = db.statement("create table user(id integer, name text)");
    db.execute(&ddl).unwrap();
    db
}

fn id_query(db: &SqlTransact) -> Query<i64> {
    db.query(
        "select id from user order by rowid",
        single_row(|cursor: &dyn RowCursor| Ok(*cursor.value_named("id")?.as_int().unwrap_or(&0))),
    )
}

#[test]
fn composite_with_batch_inserts_four_rows_in_order() {
    let path = unique_db_path("composite");
    let mut db = setup(&path);

    let composite = db.composite(vec![
        Box::new(db.statement("insert into user values(1, 'name1')")),
        Box::new(db.statement("insert into user values(2, 'name2')")),
        Box::new(db.statement_with(
            "insert into user values(?, ?)",
            bind_batch_rows(vec![
                vec![SqlValue::Int(3), SqlValue::Text("name3".into())],
                vec![SqlValue::Int(4), SqlValue::Text("name4".into())],
            ]),
        )),
    ]);

    assert_eq!(db.execute(&composite).unwrap(), 4);

    let mut query = id_query(&db);
    assert_eq!(db.fetch_all(&mut query).unwrap(), vec![1, 2, 3, 4]);
}

#[test]
fn explicit_transaction_rolls_back_on_failure() {
    let path = unique_db_path("rollback");
    let mut db = setup(&path);

    let seed = db.statement("insert into user values(1, 'kept')");
    db.execute(&seed).unwrap();

    // BEGIN turns off autocommit, so the provider rolls the whole
    // composite back when the third child fails.
    let composite = db.composite(vec![
        Box::new(db.statement("begin")),
        Box::new(db.statement("insert into user values(2, 'doomed')")),
        Box::new(db.statement("insert into nonexistent values(3)")),
    ]);
    let err = db.execute(&composite).unwrap_err();
    match &err {
        SqlTransactError::CompositionError { index, total, .. } => {
            assert_eq!((*index, *total), (3, 3));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let mut query = id_query(&db);
    assert_eq!(db.fetch_all(&mut query).unwrap(), vec![1]);
}

#[test]
fn explicit_transaction_commits_as_one_unit() {
    let path = unique_db_path("commit");
    let mut db = setup(&path);

    let composite = db.composite(vec![
        Box::new(db.statement("begin")),
        Box::new(db.statement("insert into user values(1, 'a')")),
        Box::new(db.statement("insert into user values(2, 'b')")),
    ]);
    // BEGIN contributes zero modified rows to the sum.
    assert_eq!(db.execute(&composite).unwrap(), 2);

    let mut query = id_query(&db);
    assert_eq!(db.fetch_all(&mut query).unwrap(), vec![1, 2]);
}

#[test]
fn bound_query_filters_rows() {
    let path = unique_db_path("bound_query");
    let mut db = setup(&path);

    let inserts = db.statement_with(
        "insert into user values(?, ?)",
        bind_batch_rows(vec![
            vec![SqlValue::Int(1), SqlValue::Text("ann".into())],
            vec![SqlValue::Int(2), SqlValue::Text("bob".into())],
        ]),
    );
    db.execute(&inserts).unwrap();

    let mut query = db
        .query(
            "select name from user where id = ?",
            single_row(|cursor: &dyn RowCursor| {
                Ok(cursor.value_named("name")?.as_text().unwrap_or("").to_string())
            }),
        )
        .values(vec![SqlValue::Int(2)]);
    assert_eq!(db.fetch_one(&mut query).unwrap(), Some("bob".to_string()));
}

#[test]
fn composed_binders_fill_one_statement() {
    let path = unique_db_path("composed");
    let mut db = setup(&path);

    let id_binder = bind_values(vec![SqlValue::Int(7)]);
    let name_binder = bind_values(vec![SqlValue::Text("seven".into())]);
    let op = db.statement_with(
        "insert into user values(?, ?)",
        CompositeBinder::new(vec![Box::new(id_binder), Box::new(name_binder)]),
    );
    assert_eq!(db.execute(&op).unwrap(), 1);

    let mut query = id_query(&db);
    assert_eq!(db.fetch_all(&mut query).unwrap(), vec![7]);
}

#[test]
fn lazy_iteration_over_a_real_connection() {
    let path = unique_db_path("lazy");
    let mut db = setup(&path);

    let inserts = db.statement_with(
        "insert into user values(?, ?)",
        bind_batch_rows(vec![
            vec![SqlValue::Int(1), SqlValue::Text("a".into())],
            vec![SqlValue::Int(2), SqlValue::Text("b".into())],
            vec![SqlValue::Int(3), SqlValue::Text("c".into())],
        ]),
    );
    db.execute(&inserts).unwrap();

    let mut query = id_query(&db);
    let provider = db.provider_mut();
    let mut conn = provider.borrow().unwrap();
    let mut seen = Vec::new();
    {
        let iter = query.iter(conn.as_mut()).unwrap();
        for item in iter {
            seen.push(item.unwrap());
            if seen.len() == 2 {
                break; // early termination; Drop releases the cursor
            }
        }
    }
    provider.give_back(conn).unwrap();
    assert_eq!(seen, vec![1, 2]);
}

#[test]
fn invalid_sql_surfaces_the_sqlite_cause() {
    let path = unique_db_path("invalid");
    let mut db = setup(&path);

    let op = db.statement("invalid statement *^");
    let err = db.execute(&op).unwrap_err();
    match &err {
        SqlTransactError::ExecutionError { sql, .. } => assert_eq!(sql, "invalid statement *^"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(matches!(err.root_cause(), SqlTransactError::SqliteError(_)));
}

#[test]
fn null_and_blob_round_trip() {
    let path = unique_db_path("values");
    let mut db = setup(&path);

    let ddl = db.statement("create table misc(v blob, n text)");
    db.execute(&ddl).unwrap();
    let insert = db.statement_with(
        "insert into misc values(?, ?)",
        bind_values(vec![SqlValue::Blob(vec![1, 2, 3]), SqlValue::Null]),
    );
    db.execute(&insert).unwrap();

    let mut query = db.query(
        "select v, n from misc",
        single_row(|cursor: &dyn RowCursor| Ok((cursor.value(0)?, cursor.value(1)?))),
    );
    let (blob, null) = db.fetch_one(&mut query).unwrap().unwrap();
    assert_eq!(blob, SqlValue::Blob(vec![1, 2, 3]));
    assert!(null.is_null());
}
