use data_runtime::configs::telemetry::{load_default, load_from, DEFAULT_FILTER};
use serial_test::serial;

#[test]
#[serial]
fn env_overrides_parse() {
    std::env::set_var("LOG_LEVEL", "debug");
    std::env::set_var("JSON_LOGS", "true");
    let cfg = load_default().expect("load");
    assert_eq!(cfg.filter(), "debug");
    assert!(cfg.json());
    std::env::remove_var("LOG_LEVEL");
    std::env::remove_var("JSON_LOGS");
}

#[test]
#[serial]
fn toml_file_is_read_when_present() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("telemetry.toml");
    std::fs::write(&path, "log_level = \"warn\"\nmetrics_addr = \"127.0.0.1:9100\"\n").unwrap();
    let cfg = load_from(&path).expect("load");
    assert_eq!(cfg.log_level.as_deref(), Some("warn"));
    assert_eq!(cfg.json_logs, None);
    assert_eq!(cfg.metrics_socket().unwrap().map(|a| a.port()), Some(9100));
}

#[test]
#[serial]
fn missing_file_uses_our_default_filter() {
    let tmp = tempfile::TempDir::new().unwrap();
    let cfg = load_from(&tmp.path().join("absent.toml")).expect("load");
    assert_eq!(cfg.filter(), DEFAULT_FILTER);
    assert!(!cfg.json());
    assert_eq!(cfg.metrics_socket().unwrap(), None);
}

#[test]
#[serial]
fn unknown_keys_and_bad_addresses_are_reported() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("telemetry.toml");
    std::fs::write(&path, "otlp_endpoint = \"http://localhost:4317\"\n").unwrap();
    assert!(load_from(&path).is_err());

    std::fs::write(&path, "metrics_addr = \"not an address\"\n").unwrap();
    let cfg = load_from(&path).expect("load");
    assert!(cfg.metrics_socket().is_err());
}
