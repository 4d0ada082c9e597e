//! Unit tests for configuration resolution
//!
//! Note: tests that manipulate environment variables are marked #[serial]
//! to prevent races between parallel test threads.

use prosocial_common::config::{database_path, default_data_dir, resolve_data_dir};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
fn test_default_data_dir_non_empty() {
    let dir = default_data_dir();
    assert!(!dir.as_os_str().is_empty());
    assert!(dir.to_string_lossy().contains("prosocial"));
}

#[test]
#[serial]
fn test_cli_arg_has_highest_priority() {
    env::set_var("PROSOCIAL_TEST_DATA_DIR", "/tmp/from-env");

    let resolved = resolve_data_dir(Some("/tmp/from-cli"), "PROSOCIAL_TEST_DATA_DIR").unwrap();
    assert_eq!(resolved, PathBuf::from("/tmp/from-cli"));

    env::remove_var("PROSOCIAL_TEST_DATA_DIR");
}

#[test]
#[serial]
fn test_env_var_used_when_no_cli_arg() {
    env::set_var("PROSOCIAL_TEST_DATA_DIR", "/tmp/from-env");

    let resolved = resolve_data_dir(None, "PROSOCIAL_TEST_DATA_DIR").unwrap();
    assert_eq!(resolved, PathBuf::from("/tmp/from-env"));

    env::remove_var("PROSOCIAL_TEST_DATA_DIR");
}

#[test]
#[serial]
fn test_fallback_to_platform_default() {
    env::remove_var("PROSOCIAL_TEST_DATA_DIR");

    let resolved = resolve_data_dir(None, "PROSOCIAL_TEST_DATA_DIR").unwrap();
    assert!(!resolved.as_os_str().is_empty());
}

#[test]
fn test_database_path_inside_data_dir() {
    let path = database_path(&PathBuf::from("/tmp/prosocial-data"));
    assert_eq!(path, PathBuf::from("/tmp/prosocial-data/prosocial.db"));
}
