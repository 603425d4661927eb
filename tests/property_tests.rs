//! Property-based tests for the adapter's settings.
//!
//! - every setter stores exactly what it was given
//! - host and schema reject empty strings, user and password accept them

use dbadapter::{Adapter, AdapterError, MEMORY_HOST};
use proptest::prelude::*;

fn fresh_adapter() -> Adapter {
    Adapter::new(MEMORY_HOST, "main", "", "", false).unwrap()
}

proptest! {
    #[test]
    fn prop_host_round_trip(host in ".+") {
        let mut adapter = fresh_adapter();
        adapter.set_host(&host).unwrap();
        prop_assert_eq!(adapter.get_host(), host.as_str());
    }

    #[test]
    fn prop_schema_round_trip(schema in ".+") {
        let mut adapter = fresh_adapter();
        adapter.set_schema(&schema).unwrap();
        prop_assert_eq!(adapter.get_schema(), schema.as_str());
    }

    #[test]
    fn prop_user_round_trip(user in ".*") {
        let mut adapter = fresh_adapter();
        adapter.set_user(&user);
        prop_assert_eq!(adapter.get_user(), user.as_str());
    }

    #[test]
    fn prop_password_round_trip(password in ".*") {
        let mut adapter = fresh_adapter();
        adapter.set_password(&password);
        prop_assert_eq!(adapter.get_password(), password.as_str());
    }

    #[test]
    fn prop_setters_do_not_connect(host in "[a-z/]{1,20}", schema in "[a-z]{1,10}\\.db") {
        let mut adapter = fresh_adapter();
        adapter.set_host(&host).unwrap().set_schema(&schema).unwrap();
        prop_assert!(!adapter.is_connected());
        prop_assert_eq!(adapter.target().to_string(), format!("sqlite:host={};dbname={};charset=UTF-8", host, schema));
    }
}

#[test]
fn test_empty_host_and_schema_rejected() {
    let mut adapter = fresh_adapter();
    assert!(matches!(adapter.set_host(""), Err(AdapterError::InvalidArgument(_))));
    assert!(matches!(adapter.set_schema(""), Err(AdapterError::InvalidArgument(_))));
    assert_eq!(adapter.get_host(), MEMORY_HOST);
    assert_eq!(adapter.get_schema(), "main");
}
