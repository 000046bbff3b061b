//! Loading configuration files from disk

use std::io::Write;

use dispatch::config::DispatchConfig;
use dispatch::prelude::*;
use tempfile::NamedTempFile;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_config(
        r#"
server:
  bind: 0.0.0.0:8080
notification:
  timeout_ms: 1500
  operator_email: ops@example.com
assignment:
  max_auto_attempts: 2
  link_expiry_minutes:
    Harbour: 15
catalog:
  strict: true
contractors:
  - id: c-1
    name: Acme
    email: acme@example.com
    rate: 120
    service_locations: north, harbour
  - id: c-2
    name: Dormant
    email: dormant@example.com
    rate: 80
    active: false
standard_rates:
  - contractor_id: c-1
    client: Mall One
    area: north
    rate: 99.5
"#,
    );

    let config = DispatchConfig::from_yaml_file(file.path()).unwrap();
    assert_eq!(config.server.bind, "0.0.0.0:8080");
    assert_eq!(config.notification.timeout().as_millis(), 1500);
    assert_eq!(config.notification.operator_email, "ops@example.com");
    assert_eq!(config.assignment.max_auto_attempts, 2);
    assert_eq!(
        config.assignment.link_expiry("harbour"),
        chrono::Duration::minutes(15)
    );
    assert!(config.catalog.strict);
    assert_eq!(config.contractors.len(), 2);
    assert!(config.contractors[0].active);
    assert!(!config.contractors[1].active);
    assert_eq!(config.contractors[1].service_locations, "");
    assert_eq!(config.standard_rates[0].rate, 99.5);
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(DispatchConfig::from_yaml_file(dir.path().join("absent.yaml")).is_err());
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let file = write_config("assignment:\n  link_expiry_minutes:\n    north: 0\n");
    let err = DispatchConfig::from_yaml_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("link_expiry_minutes.north"));

    let file = write_config("contractors:\n  - id: ' '\n    name: x\n    email: x\n    rate: 1\n");
    assert!(DispatchConfig::from_yaml_file(file.path()).is_err());
}

#[test]
fn test_malformed_yaml_rejected() {
    let file = write_config("server: [unclosed");
    assert!(DispatchConfig::from_yaml_file(file.path()).is_err());
}

#[tokio::test]
async fn test_loaded_config_drives_the_server() {
    let file = write_config(
        "contractors:\n  - id: c-1\n    name: Acme\n    email: a@example.com\n    rate: 10\n    service_locations: harbour\n",
    );
    let config = DispatchConfig::from_yaml_file(file.path()).unwrap();
    let (host, _) = DispatchServerBuilder::new()
        .with_config(config)
        .build_host()
        .unwrap();
    let found = host.engine().matcher().find_by_area("Harbour").await.unwrap();
    assert_eq!(found.len(), 1);
}
