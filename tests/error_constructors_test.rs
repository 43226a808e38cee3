use perla_bridge::error::PerlaError;

#[test]
fn error_constructors_portal_kinds() {
    assert!(matches!(
        PerlaError::connection("x"),
        PerlaError::Connection { .. }
    ));
    assert!(matches!(PerlaError::auth("x"), PerlaError::Auth { .. }));
    assert!(matches!(PerlaError::api("x"), PerlaError::Api { .. }));
    assert!(matches!(
        PerlaError::insufficient_data("x"),
        PerlaError::InsufficientData { .. }
    ));
    assert!(matches!(
        PerlaError::update_failed("x"),
        PerlaError::UpdateFailed { .. }
    ));
}

#[test]
fn error_constructors_ambient_kinds() {
    assert!(matches!(PerlaError::config("x"), PerlaError::Config { .. }));
    assert!(matches!(
        PerlaError::validation("f", "m"),
        PerlaError::Validation { .. }
    ));
    assert!(matches!(PerlaError::io("x"), PerlaError::Io { .. }));
    let ser = PerlaError::Serialization {
        message: "s".into(),
    };
    assert!(matches!(ser, PerlaError::Serialization { .. }));
}

#[test]
fn classifiers_are_exclusive() {
    let auth = PerlaError::auth("expired");
    assert!(auth.is_auth() && !auth.is_connection() && !auth.is_api());

    let conn = PerlaError::connection("refused");
    assert!(conn.is_connection() && !conn.is_auth());

    let api = PerlaError::api("device not found");
    assert!(api.is_api() && !api.is_auth());

    assert!(!PerlaError::update_failed("x").is_api());
}

#[test]
fn display_messages() {
    let e = PerlaError::validation("field", "bad");
    assert!(format!("{}", e).contains("Validation error"));

    let e = PerlaError::api("live marker not found on device page");
    assert_eq!(e.to_string(), "API error: live marker not found on device page");
}

#[test]
fn json_errors_convert_to_serialization() {
    let err: PerlaError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
    assert!(matches!(err, PerlaError::Serialization { .. }));
}
