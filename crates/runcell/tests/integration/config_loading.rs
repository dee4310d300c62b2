use std::net::SocketAddr;

use runcell::config::{Config, EXAMPLE_CONFIG, LanguageRegistry};

use super::FIXTURES_PATH;

#[test]
fn test_load_valid_config() {
    let path = format!("{FIXTURES_PATH}/configs/valid_full.toml");
    let config = Config::from_file(&path).expect("Failed to load config");

    assert_eq!(config.workspace_root.to_str(), Some("/tmp/runcell-fixture"));
    assert_eq!(config.max_concurrent_executions, 2);
    assert_eq!(config.max_output_bytes, 4096);
    assert_eq!(config.server.bind, "127.0.0.1:4100".parse::<SocketAddr>().unwrap());
}

#[test]
fn test_load_minimal_config() {
    let path = format!("{FIXTURES_PATH}/configs/valid_minimal.toml");
    let config = Config::from_file(&path).expect("Failed to load config");

    assert_eq!(config.max_concurrent_executions, 1);
    assert_eq!(config.max_output_bytes, Config::default().max_output_bytes);
}

#[test]
fn test_load_invalid_zero_concurrency() {
    let path = format!("{FIXTURES_PATH}/configs/invalid_zero_concurrency.toml");
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_load_invalid_bind() {
    let path = format!("{FIXTURES_PATH}/configs/invalid_bind.toml");
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_example_config_parses() {
    let config = Config::parse_toml(EXAMPLE_CONFIG).expect("example config should parse");
    assert_eq!(config.max_concurrent_executions, 8);
}

#[test]
fn test_load_shell_languages() {
    let content = std::fs::read_to_string(format!("{FIXTURES_PATH}/languages/shell.toml")).unwrap();
    let registry = LanguageRegistry::parse_toml(&content).expect("Failed to load languages");

    assert_eq!(registry.ids().collect::<Vec<_>>(), ["sh", "shc"]);
    assert!(!registry.lookup("sh").unwrap().is_compiled());
    assert!(registry.lookup("SHC").unwrap().is_compiled());
}

#[test]
fn test_load_invalid_languages() {
    for name in [
        "invalid_empty_name",
        "invalid_empty_run_command",
        "invalid_interpreted_output",
    ] {
        let content =
            std::fs::read_to_string(format!("{FIXTURES_PATH}/languages/{name}.toml")).unwrap();
        assert!(
            LanguageRegistry::parse_toml(&content).is_err(),
            "{name} should be rejected"
        );
    }
}
