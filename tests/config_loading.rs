//! Loading configurations from files and the environment.

#![allow(unsafe_code)]

use hot_reloader::prelude::*;
use hot_reloader::settings::DEFAULT_CLONED_RESOURCE_TAG_NAME;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_from_yaml() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("hot_reload.yaml");
    fs::write(&config_path, "cloned_resource_tag_name: LiveCopy\n").unwrap();

    let configuration = Configuration::builder()
        .with_file(&config_path)
        .build()
        .unwrap();
    assert_eq!(configuration.cloned_resource_tag_name(), "LiveCopy");
}

#[test]
fn test_load_from_toml() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("hot_reload.toml");
    fs::write(&config_path, "cloned_resource_tag_name = \"TomlCopy\"\n").unwrap();

    let configuration = Configuration::builder()
        .with_file(&config_path)
        .build()
        .unwrap();
    assert_eq!(configuration.cloned_resource_tag_name(), "TomlCopy");
}

#[test]
fn test_load_from_json() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("hot_reload.json");
    fs::write(&config_path, r#"{"cloned_resource_tag_name": "JsonCopy"}"#).unwrap();

    let configuration = Configuration::builder()
        .with_file(&config_path)
        .build()
        .unwrap();
    assert_eq!(configuration.cloned_resource_tag_name(), "JsonCopy");
}

#[test]
fn test_empty_file_keeps_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("hot_reload.json");
    fs::write(&config_path, "{}").unwrap();

    let configuration = Configuration::builder()
        .with_file(&config_path)
        .build()
        .unwrap();
    assert_eq!(
        configuration.cloned_resource_tag_name(),
        DEFAULT_CLONED_RESOURCE_TAG_NAME
    );
}

#[test]
fn test_later_files_override_earlier_ones() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("base.yaml");
    let local = temp_dir.path().join("local.toml");
    fs::write(&base, "cloned_resource_tag_name: BaseCopy\n").unwrap();
    fs::write(&local, "cloned_resource_tag_name = \"LocalCopy\"\n").unwrap();

    let configuration = Configuration::builder()
        .with_props(ConfigurationProps {
            cloned_resource_tag_name: "PropsCopy".to_string(),
        })
        .with_file(&base)
        .with_file(&local)
        .build()
        .unwrap();
    assert_eq!(configuration.cloned_resource_tag_name(), "LocalCopy");
}

#[test]
fn test_env_overrides_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("hot_reload.yaml");
    fs::write(&config_path, "cloned_resource_tag_name: FileCopy\n").unwrap();

    // Prefix is unique to this test.
    unsafe {
        std::env::set_var("HRENVTEST_CLONED_RESOURCE_TAG_NAME", "EnvCopy");
    }

    let configuration = Configuration::builder()
        .with_file(&config_path)
        .with_env_overrides("HRENVTEST", "__")
        .build()
        .unwrap();
    assert_eq!(configuration.cloned_resource_tag_name(), "EnvCopy");

    unsafe {
        std::env::remove_var("HRENVTEST_CLONED_RESOURCE_TAG_NAME");
    }
}

#[test]
fn test_invalid_tag_in_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("hot_reload.yaml");
    fs::write(&config_path, "cloned_resource_tag_name: \"Live Copy\"\n").unwrap();

    let result = Configuration::builder().with_file(&config_path).build();
    assert!(matches!(result, Err(ReloadError::InvalidConfiguration(_))));
}

#[test]
fn test_missing_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let result = Configuration::builder()
        .with_file(temp_dir.path().join("missing.yaml"))
        .build();
    assert!(matches!(result, Err(ReloadError::LoadError(_))));
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("hot_reload.ini");
    fs::write(&config_path, "cloned_resource_tag_name=IniCopy\n").unwrap();

    let result = Configuration::builder().with_file(&config_path).build();
    assert!(matches!(result, Err(ReloadError::LoadError(_))));
}

#[test]
fn test_builder_printer_receives_reload_messages() {
    let messages = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    let messages_clone = std::sync::Arc::clone(&messages);
    let configuration = Configuration::builder()
        .with_printer(move |message| messages_clone.lock().push(message.to_string()))
        .build()
        .unwrap();

    let host = Host::new();
    let folder = host.create_folder("Shared", Some(host.root())).unwrap();
    let module = host.create_module("Armor", Some(folder), "v1").unwrap();
    host.dispatch_pending();
    let reloader = Reloader::with_configuration(host.clone(), configuration);
    let _stop = reloader.listen(module, |_, _| {}, |_, _| {});

    host.set_source(module, "v2").unwrap();
    host.dispatch_pending();
    assert_eq!(*messages.lock(), vec!["HotReloaded Shared.Armor"]);
}
