use std::fs;
use std::path::Path;

use lexical_populate::config::*;
use serde_json::json;
use tempfile::TempDir;

#[test]
fn test_default_config_values() {
    let config = PopulateConfig::default();
    assert_eq!(config.listen, "127.0.0.1:1337");
    assert_eq!(config.lexical_field, "content");
    assert_eq!(config.max_depth, 256);
    assert_eq!(config.max_concurrent_queries, 8);
    assert!(config.title_fields.iter().any(|f| f == "title"));
    assert!(config.admin_token.is_none());
}

#[test]
fn test_missing_config_loads_defaults() {
    let dir = TempDir::new().unwrap();
    let loaded = load_config(dir.path()).unwrap();
    assert_eq!(loaded, PopulateConfig::default());
}

#[test]
fn test_save_and_load_config() {
    let dir = TempDir::new().unwrap();
    let mut config = PopulateConfig::default();
    config.lexical_field = "body".to_string();
    config.admin_token = Some("secret".to_string());
    config
        .title_field_overrides
        .insert("api::product.product".to_string(), vec!["sku".to_string()]);

    save_config(dir.path(), &config).unwrap();
    assert!(get_config_path(dir.path()).exists());
    assert!(!get_config_path(dir.path()).with_extension("tmp").exists());

    let loaded = load_config(dir.path()).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_config_fills_defaults() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(get_lexical_dir(dir.path())).unwrap();
    fs::write(
        get_config_path(dir.path()),
        json!({"lexical_field": "richText", "max_depth": 32}).to_string(),
    )
    .unwrap();

    let loaded = load_config(dir.path()).unwrap();
    assert_eq!(loaded.lexical_field, "richText");
    assert_eq!(loaded.max_depth, 32);
    assert_eq!(loaded.listen, "127.0.0.1:1337");
}

#[test]
fn test_invalid_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(get_lexical_dir(dir.path())).unwrap();

    fs::write(get_config_path(dir.path()), "{ not json").unwrap();
    assert!(load_config(dir.path()).is_err());

    fs::write(get_config_path(dir.path()), json!({"max_depth": 0}).to_string()).unwrap();
    assert!(load_config(dir.path()).is_err());
}

#[test]
fn test_title_fields_from_config() {
    let mut config = PopulateConfig::default();
    config.title_fields = vec!["name".to_string()];
    config
        .title_field_overrides
        .insert("api::product.product".to_string(), vec!["sku".to_string()]);

    let titles = config.title_fields();
    assert_eq!(titles.candidates("api::post.post"), &["name".to_string()]);
    assert_eq!(titles.candidates("api::product.product"), &["sku".to_string()]);
}

#[test]
fn test_database_path_resolution() {
    let mut config = PopulateConfig::default();
    let root = Path::new("/srv/project");
    assert_eq!(
        config.database_path(root),
        root.join(".lexical").join("populate.db")
    );

    config.database_path = "/var/lib/populate.db".to_string();
    assert_eq!(config.database_path(root), Path::new("/var/lib/populate.db"));
}
