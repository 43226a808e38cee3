//! Extraction of device data from portal pages and payloads.
//!
//! Everything here is synchronous and works on owned strings so that parsed
//! documents never live across an `.await`. Each field is extracted on its
//! own; a malformed field is logged and skipped without failing the rest.

use super::types::{ChartAttributes, ConsumptionRow, RowOrder};
use crate::datetime::parse_datetime;
use crate::error::{PerlaError, Result};
use crate::logging::get_logger;
use crate::sensors::{SensorKey, SensorRecord, SensorValue};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use serde_json::Value;

const LIVE_PROPS_ATTR: &str = "data-live-props-value";
const CHART_DATASET_ATTR: &str = "data-chart-dataset-value";
const CHART_SALT_ATTR: &str = "data-chart-salt-value";

// Compiled once; `None` only if a pattern below is malformed
static DEVICE_LINK: Lazy<Option<Selector>> =
    Lazy::new(|| Selector::parse(r#"a[href*="/device?receiptLineKey="]"#).ok());
static DEVICE_INFO: Lazy<Option<Selector>> =
    Lazy::new(|| Selector::parse("div.informations").ok());
static SPAN: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("span").ok());
static LIVE_MARKER: Lazy<Option<Selector>> =
    Lazy::new(|| Selector::parse(r#"div[data-controller="live"]"#).ok());
static CHART: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("div#graph_device").ok());
static DEVICE_KEY: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"receiptLineKey=([^&]+)").ok());

fn compiled<'a, T>(pattern: &'a Lazy<Option<T>>, name: &str) -> Result<&'a T> {
    pattern
        .as_ref()
        .ok_or_else(|| PerlaError::api(format!("invalid {} pattern", name)))
}

/// Find the `receiptLineKey` of the dashboard entry whose description
/// mentions `serial`. First match wins.
pub fn find_device_key(html: &str, serial: &str) -> Result<Option<String>> {
    let link_sel = compiled(&DEVICE_LINK, "device link")?;
    let info_sel = compiled(&DEVICE_INFO, "device info")?;
    let span_sel = compiled(&SPAN, "span")?;
    let key_re = compiled(&DEVICE_KEY, "device key")?;

    let doc = Html::parse_document(html);
    for link in doc.select(link_sel) {
        let Some(info) = link.select(info_sel).next() else {
            continue;
        };
        let mentions_serial = info
            .select(span_sel)
            .any(|span| element_text(&span).contains(serial));
        if !mentions_serial {
            continue;
        }
        if let Some(href) = link.value().attr("href")
            && let Some(caps) = key_re.captures(href)
        {
            return Ok(Some(caps[1].to_string()));
        }
    }
    Ok(None)
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

/// Props blob of the live component on the device page, entity-decoded.
/// `None` when the marker element is missing.
pub fn extract_live_props(html: &str) -> Result<Option<String>> {
    let marker_sel = compiled(&LIVE_MARKER, "live marker")?;
    let doc = Html::parse_document(html);
    Ok(doc.select(marker_sel).next().map(|marker| {
        unescape_entities(marker.value().attr(LIVE_PROPS_ATTR).unwrap_or_default())
    }))
}

/// Chart attributes from the component-refresh fragment.
/// `None` when the device has no consumption chart.
pub fn extract_chart(html: &str) -> Result<Option<ChartAttributes>> {
    let chart_sel = compiled(&CHART, "chart")?;
    let doc = Html::parse_fragment(html);
    Ok(doc.select(chart_sel).next().map(|chart| {
        let attrs = chart.value();
        ChartAttributes {
            dataset: unescape_entities(attrs.attr(CHART_DATASET_ATTR).unwrap_or("{}")),
            salt_per_regen: attrs.attr(CHART_SALT_ATTR).map(str::to_string),
        }
    }))
}

#[derive(Serialize)]
struct RefreshEnvelope<'a> {
    props: &'a Value,
    updated: serde_json::Map<String, Value>,
    args: serde_json::Map<String, Value>,
}

/// Wrap the live props into the body expected by the component-refresh endpoint
pub fn build_refresh_envelope(props: &str) -> Result<String> {
    let props: Value = serde_json::from_str(props)
        .map_err(|e| PerlaError::api(format!("live props are not valid JSON: {}", e)))?;
    let envelope = RefreshEnvelope {
        props: &props,
        updated: serde_json::Map::new(),
        args: serde_json::Map::new(),
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Decode HTML character references: the named XML set, `&nbsp;`, and
/// decimal or hex numeric references. Unknown references are kept verbatim.
pub fn unescape_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_reference(&tail[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "quot" => Some('"'),
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Map the product-summary JSON onto status sensors.
///
/// Keys the portal leaves out stay out of the record.
pub fn parse_status(body: &Value) -> SensorRecord {
    let logger = get_logger("portal");
    let mut record = SensorRecord::new();

    if let Some(online) = body.get("online").and_then(Value::as_bool) {
        record.insert(SensorKey::Online, SensorValue::Bool(online));
    }

    if let Some(data) = body.get("data") {
        if let Some(standby) = data.get("standBy").and_then(Value::as_bool) {
            record.insert(SensorKey::Standby, SensorValue::Bool(standby));
        }
        if let Some(salt) = data.get("salt").and_then(SensorValue::from_json) {
            record.insert(SensorKey::Salt, salt);
        }
    }

    let Some(categories) = body.get("dataCategories").and_then(Value::as_object) else {
        logger.debug("Summary has no dataCategories object");
        return record;
    };

    for (name, category) in categories {
        let Some(items) = category.as_array() else {
            logger.debug(&format!("Skipping category '{}': not a list", name));
            continue;
        };
        for item in items {
            let Some(code) = item.get("code").and_then(Value::as_str) else {
                continue;
            };
            let Some(key) = SensorKey::from_status_code(code) else {
                continue;
            };
            if let Some(value) = item.get("value").and_then(SensorValue::from_json) {
                logger.trace(&format!("Mapped '{}' -> '{}': {:?}", code, key, value));
                record.insert(key, value);
            }
        }
    }

    record
}

/// Map the chart attributes onto consumption sensors
pub fn parse_consumption(chart: &ChartAttributes, order: RowOrder) -> Result<SensorRecord> {
    let logger = get_logger("portal");
    let dataset: Value = serde_json::from_str(&chart.dataset)
        .map_err(|e| PerlaError::api(format!("consumption dataset is not valid JSON: {}", e)))?;

    let mut record = SensorRecord::new();

    let salt_per_regen = match chart.salt_per_regen.as_deref() {
        None => Some(0),
        Some(raw) => {
            let parsed = raw.trim().parse::<i64>().ok().filter(|v| *v >= 0);
            if parsed.is_none() {
                logger.warn(&format!("Ignoring salt-per-regeneration value '{}'", raw));
            }
            parsed
        }
    };
    if let Some(salt) = salt_per_regen {
        record.insert(SensorKey::SaltPerRegen, SensorValue::Int(salt));
    }

    if let Some(refresh) = dataset
        .get("refreshDate")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
    {
        record.insert(
            SensorKey::RefreshDate,
            SensorValue::Timestamp(parse_datetime(refresh)),
        );
    }

    let lines = dataset
        .get("lines")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let Some(row) = select_row(lines, order) else {
        logger.debug("Consumption dataset has no usable row");
        return Ok(record);
    };

    record.insert(SensorKey::LastDate, SensorValue::Text(row.date.clone()));
    record.insert(
        SensorKey::LastUpdate,
        SensorValue::Timestamp(parse_datetime(&row.date)),
    );
    record.insert(SensorKey::RegenCount, SensorValue::Int(row.regen_count));
    record.insert(SensorKey::PowerOutage, SensorValue::Bool(row.power_outage));
    record.insert(
        SensorKey::WaterConsumption,
        SensorValue::Int(row.water_consumption),
    );
    record.insert(SensorKey::SaltAlarm, SensorValue::Bool(row.salt_alarm));
    if let Some(salt) = salt_per_regen {
        record.insert(
            SensorKey::SaltConsumption,
            SensorValue::Int(row.regen_count.saturating_mul(salt)),
        );
    }

    Ok(record)
}

/// Pick the row treated as most recent under `order`
pub fn select_row(lines: &[Value], order: RowOrder) -> Option<ConsumptionRow> {
    match order {
        RowOrder::NewestFirst => lines.first().and_then(parse_row),
        RowOrder::NewestLast => lines.last().and_then(parse_row),
        RowOrder::ByDate => {
            let rows: Vec<ConsumptionRow> = lines.iter().filter_map(parse_row).collect();
            rows.iter()
                .filter_map(|row| parse_datetime(&row.date).map(|at| (at, row)))
                .max_by_key(|(at, _)| *at)
                .map(|(_, row)| row.clone())
                .or_else(|| rows.into_iter().next())
        }
    }
}

/// Decode `[date, regenCount, powerOutage, waterConsumption, saltAlarm]`
pub fn parse_row(line: &Value) -> Option<ConsumptionRow> {
    let cols = line.as_array()?;
    if cols.len() < 5 {
        get_logger("portal").debug(&format!("Ignoring short consumption row: {}", line));
        return None;
    }
    let date = cols[0].as_str()?.to_string();
    Some(ConsumptionRow {
        date,
        regen_count: loose_count(&cols[1]),
        power_outage: cols[2].as_bool().unwrap_or(false),
        water_consumption: loose_count(&cols[3]),
        salt_alarm: cols[4].as_bool().unwrap_or(false),
    })
}

/// Counters arrive as numbers or numeric strings; anything else counts as 0
fn loose_count(value: &Value) -> i64 {
    let n = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    };
    n.unwrap_or(0).max(0)
}
