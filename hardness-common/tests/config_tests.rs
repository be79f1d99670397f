//! Tests for configuration loading and root folder resolution
//!
//! Uses the serial_test crate: tests that manipulate HARDNESS_ROOT_FOLDER are
//! marked with #[serial] so they never race each other.

use hardness_common::config::{
    CompiledDefaults, RootFolderInitializer, RootFolderResolver, TomlConfig, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert_eq!(defaults.log_level, "info");
    assert!(defaults.root_folder.to_string_lossy().contains("soil"));
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolver = RootFolderResolver::new(None, &TomlConfig::default());
    let resolved = resolver.resolve();

    assert_eq!(resolved, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
#[serial]
fn test_cli_argument_beats_environment() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/from-env");

    let resolver = RootFolderResolver::new(Some(PathBuf::from("/tmp/from-cli")), &TomlConfig::default());
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/from-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_environment_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/from-env");

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };
    let resolver = RootFolderResolver::new(None, &config);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/from-env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_used_when_environment_empty() {
    env::set_var(ROOT_FOLDER_ENV, "  ");

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };
    let resolver = RootFolderResolver::new(None, &config);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/from-toml"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
fn test_load_full_toml_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hardness.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/var/lib/soil-hardness"
database = "hardness.db"
media_dir = "media"

[logging]
level = "debug"

[plot]
reduction = "mean"
dpi = 150
"#,
    )
    .unwrap();

    let config = TomlConfig::load(&path).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/var/lib/soil-hardness")));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.plot.reduction, "mean");
    assert_eq!(config.plot.dpi, 150);
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let config = TomlConfig::load_or_default(Some(&dir.path().join("absent.toml")));

    assert!(config.root_folder.is_none());
    assert_eq!(config.plot.dpi, 300);
}

#[test]
fn test_malformed_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hardness.toml");
    std::fs::write(&path, "root_folder = [not toml").unwrap();

    assert!(TomlConfig::load(&path).is_err());
    let config = TomlConfig::load_or_default(Some(&path));
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_initializer_creates_directories() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("nested").join("root");

    let init = RootFolderInitializer::new(root.clone(), &TomlConfig::default());
    init.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert!(init.media_dir().is_dir());
    assert_eq!(init.database_path(), root.join("hardness.db"));
}
