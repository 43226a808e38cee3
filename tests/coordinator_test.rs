use mockito::{Matcher, Server};
use perla_bridge::config::Config;
use perla_bridge::coordinator::Coordinator;
use perla_bridge::sensors::{SensorKey, SensorValue};

const DASHBOARD: &str = r#"<a href="/device?receiptLineKey=KEY9">
  <div class="informations"><span>SN 777</span></div></a>"#;

const DEVICE_PAGE: &str =
    r#"<div data-controller="live" data-live-props-value="{&quot;id&quot;:1}"></div>"#;

const CHART_FRAGMENT: &str = r#"<div id="graph_device"
  data-chart-dataset-value="{&quot;refreshDate&quot;:&quot;2024-03-15T08:00:00&quot;,&quot;lines&quot;:[[&quot;2024-03-15&quot;,2,false,500,false]]}"
  data-chart-salt-value="100"></div>"#;

fn config(base_url: String) -> Config {
    let mut cfg = Config::default();
    cfg.account.username = "user".to_string();
    cfg.account.password = "pass".to_string();
    cfg.account.serial_number = "777".to_string();
    cfg.portal.base_url = base_url;
    cfg
}

#[tokio::test]
async fn polls_real_client_against_mock_portal() {
    let mut server = Server::new_async().await;
    let login = server
        .mock("POST", "/login")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let _dashboard = server
        .mock("GET", "/dashboard")
        .with_status(200)
        .with_body(DASHBOARD)
        .create_async()
        .await;
    let summary = server
        .mock("GET", "/ajax/product-summary/KEY9")
        .with_status(200)
        .with_body(r#"{"online": true, "dataCategories": {"c": [{"code": "rssiLevel", "value": -61}]}}"#)
        .expect(1)
        .create_async()
        .await;
    let _device = server
        .mock("GET", Matcher::Regex(r"^/device".to_string()))
        .with_status(200)
        .with_body(DEVICE_PAGE)
        .create_async()
        .await;
    let _refresh = server
        .mock("POST", "/_components/DeviceTabs/loadConso")
        .with_status(200)
        .with_body(CHART_FRAGMENT)
        .create_async()
        .await;

    let mut coordinator = Coordinator::from_config(&config(server.url()));
    let rx = coordinator.subscribe();

    coordinator.refresh().await.unwrap();
    // second tick: session reused, status not due yet
    coordinator.refresh().await.unwrap();

    login.assert_async().await;
    summary.assert_async().await;

    let snap = rx.borrow().clone();
    assert!(snap.available);
    assert_eq!(snap.total_ticks, 2);
    assert_eq!(snap.get(SensorKey::WifiSignal), Some(&SensorValue::Int(-61)));
    assert_eq!(snap.get(SensorKey::WaterConsumption), Some(&SensorValue::Int(500)));
    assert_eq!(snap.get(SensorKey::WaterIncrement), Some(&SensorValue::Int(0)));
    assert_eq!(snap.get(SensorKey::SaltConsumption), Some(&SensorValue::Int(200)));

    coordinator.shutdown().await;
}

#[tokio::test]
async fn unreachable_portal_surfaces_update_failed() {
    let mut coordinator = Coordinator::from_config(&config("http://127.0.0.1:1".to_string()));

    let err = coordinator.refresh().await.unwrap_err();
    assert!(matches!(err, perla_bridge::PerlaError::UpdateFailed { .. }));
    assert!(err.to_string().contains("Error communicating with API"));
    assert!(!coordinator.available());
    assert!(coordinator.device_key().is_none());
    assert_eq!(coordinator.snapshot().consecutive_failures, 1);
}
