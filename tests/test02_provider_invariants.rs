use std::cell::Cell;
use std::rc::Rc;

use sql_transact::prelude::*;
use sql_transact::test_utils::MockDriver;

#[test]
fn second_borrow_fails_while_one_is_outstanding() {
    let driver = MockDriver::new();
    let mut provider = SingleConnectionProvider::new(driver.connection());

    let conn = provider.borrow().unwrap();
    let events_before = driver.events().len();

    let Err(err) = provider.borrow() else {
        panic!("second borrow should fail")
    };
    assert!(matches!(err, SqlTransactError::ResourceStateError(_)));
    // The failure happens before the driver is contacted.
    assert_eq!(driver.events().len(), events_before);

    provider.give_back(conn).unwrap();
    // After give-back the connection can be borrowed again.
    let conn = provider.borrow().unwrap();
    provider.give_back(conn).unwrap();
}

#[test]
fn retain_mode_keeps_the_connection_open() {
    let driver = MockDriver::new();
    let mut provider = SingleConnectionProvider::new(driver.connection());

    let conn = provider.borrow().unwrap();
    provider.give_back(conn).unwrap();
    assert!(!driver.events().contains(&"close_connection".to_string()));
}

#[test]
fn close_mode_closes_and_refuses_further_borrows() {
    let driver = MockDriver::new();
    let mut provider =
        SingleConnectionProvider::with_release_mode(driver.connection(), ReleaseMode::Close);

    let conn = provider.borrow().unwrap();
    provider.give_back(conn).unwrap();
    assert!(driver.events().contains(&"close_connection".to_string()));

    let Err(err) = provider.borrow() else {
        panic!("borrow after close should fail")
    };
    assert!(matches!(err, SqlTransactError::ConnectionError(_)));
}

#[test]
fn commit_and_rollback_are_noops_on_autocommit_connections() {
    let driver = MockDriver::new();
    driver.set_autocommit(true);
    let mut provider = SingleConnectionProvider::new(driver.connection());

    let mut conn = provider.borrow().unwrap();
    provider.commit(conn.as_mut()).unwrap();
    provider.rollback(conn.as_mut()).unwrap();
    provider.give_back(conn).unwrap();

    let events = driver.events();
    assert!(!events.contains(&"commit".to_string()));
    assert!(!events.contains(&"rollback".to_string()));
}

#[test]
fn commit_and_rollback_delegate_when_not_autocommit() {
    let driver = MockDriver::new();
    let mut provider = SingleConnectionProvider::new(driver.connection());

    let mut conn = provider.borrow().unwrap();
    provider.commit(conn.as_mut()).unwrap();
    provider.rollback(conn.as_mut()).unwrap();
    provider.give_back(conn).unwrap();

    let events = driver.events();
    assert!(events.contains(&"commit".to_string()));
    assert!(events.contains(&"rollback".to_string()));
}

#[test]
fn pooled_provider_enforces_single_outstanding_before_acquiring() {
    let driver = MockDriver::new();
    let acquires = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&acquires);
    let mut provider = PooledConnectionProvider::new(move || {
        counter.set(counter.get() + 1);
        Ok(driver.connection())
    });

    let conn = provider.borrow().unwrap();
    assert_eq!(acquires.get(), 1);

    let Err(err) = provider.borrow() else {
        panic!("second borrow should fail")
    };
    assert!(matches!(err, SqlTransactError::ResourceStateError(_)));
    // The source was never asked for a second connection.
    assert_eq!(acquires.get(), 1);

    provider.give_back(conn).unwrap();
    let conn = provider.borrow().unwrap();
    assert_eq!(acquires.get(), 2);
    provider.give_back(conn).unwrap();
}

#[test]
fn pooled_provider_releases_by_closing_the_handle() {
    let driver = MockDriver::new();
    let source = driver.clone();
    let mut provider = PooledConnectionProvider::new(move || Ok(source.connection()));

    let conn = provider.borrow().unwrap();
    provider.give_back(conn).unwrap();
    assert!(driver.events().contains(&"close_connection".to_string()));
}
