#![no_main]
use libfuzzer_sys::fuzz_target;
use perla_bridge::portal::scrape;
use perla_bridge::portal::{ChartAttributes, RowOrder};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    // Page scrapers must tolerate arbitrary markup
    let _ = scrape::find_device_key(&text, "SN");
    if let Ok(Some(props)) = scrape::extract_live_props(&text) {
        let _ = scrape::build_refresh_envelope(&props);
    }
    let _ = scrape::extract_chart(&text);
    let _ = scrape::unescape_entities(&text);

    // Arbitrary bytes as status JSON and as a chart dataset
    if let Ok(body) = serde_json::from_slice::<serde_json::Value>(data) {
        let _ = scrape::parse_status(&body);
    }
    let chart = ChartAttributes {
        dataset: text.to_string(),
        salt_per_regen: Some(text.chars().take(8).collect()),
    };
    for order in [RowOrder::NewestFirst, RowOrder::NewestLast, RowOrder::ByDate] {
        let _ = scrape::parse_consumption(&chart, order);
    }
});
