use perla_bridge::config::Config;
use perla_bridge::portal::RowOrder;
use std::fs;

fn valid() -> Config {
    let mut cfg = Config::default();
    cfg.account.username = "user@example.com".to_string();
    cfg.account.password = "secret".to_string();
    cfg.account.serial_number = "SN123".to_string();
    cfg
}

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = valid();
    cfg.device_name = "Basement softener".to_string();
    cfg.polling.consumption_interval_secs = 120;
    cfg.portal.row_order = RowOrder::ByDate;
    cfg.logging.file = path.with_extension("log").to_string_lossy().to_string();

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.device_name, "Basement softener");
    assert_eq!(loaded.account.serial_number, "SN123");
    assert_eq!(loaded.polling.consumption_interval_secs, 120);
    assert_eq!(loaded.portal.row_order, RowOrder::ByDate);
    assert_eq!(loaded.logging.file, cfg.logging.file);
}

#[test]
fn password_is_not_written_to_disk() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    valid().save_to_file(tmp.path()).unwrap();
    let text = fs::read_to_string(tmp.path()).unwrap();
    assert!(!text.contains("secret"));
}

#[test]
fn partial_yaml_uses_defaults() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        "account:\n  username: a\n  password: b\n  serial_number: c\npolling:\n  status_interval_secs: 600\n",
    )
    .unwrap();
    let cfg = Config::from_file(tmp.path()).unwrap();
    assert_eq!(cfg.polling.status_interval_secs, 600);
    assert_eq!(cfg.polling.consumption_interval_secs, 60);
    assert_eq!(cfg.portal.base_url, "https://www.bwt-monservice.com");
    assert_eq!(cfg.portal.row_order, RowOrder::NewestFirst);
    assert!(cfg.validate().is_ok());
}

#[test]
fn config_validation_errors() {
    assert!(valid().validate().is_ok());

    let mut cfg = valid();
    cfg.account.username.clear();
    assert!(cfg.validate().is_err());

    cfg = valid();
    cfg.account.serial_number = "  ".to_string();
    assert!(cfg.validate().is_err());

    // Cadence bounds are inclusive
    cfg = valid();
    cfg.polling.status_interval_secs = 300;
    cfg.polling.consumption_interval_secs = 3600;
    assert!(cfg.validate().is_ok());

    cfg = valid();
    cfg.polling.status_interval_secs = 299;
    assert!(cfg.validate().is_err());

    cfg = valid();
    cfg.polling.status_interval_secs = 86_401;
    assert!(cfg.validate().is_err());

    cfg = valid();
    cfg.polling.consumption_interval_secs = 59;
    assert!(cfg.validate().is_err());

    cfg = valid();
    cfg.portal.base_url = "not a url".to_string();
    assert!(cfg.validate().is_err());

    cfg = valid();
    cfg.portal.connect_timeout_secs = 60;
    assert!(cfg.validate().is_err());
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"bad: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::from_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(format!("{}", err).contains("I/O error"));
}
