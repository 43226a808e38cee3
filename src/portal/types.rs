use serde::{Deserialize, Serialize};

/// Which consumption row counts as the most recent one.
///
/// The portal currently lists rows newest-first. That ordering is not a
/// documented guarantee, so the choice is a named policy instead of a bare
/// `lines[0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOrder {
    /// Take the first row
    #[default]
    NewestFirst,
    /// Take the last row
    NewestLast,
    /// Take the row with the latest parsable date, first row if none parse
    ByDate,
}

/// Attributes lifted from the consumption chart element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartAttributes {
    /// Entity-decoded JSON dataset (`refreshDate`, `lines`)
    pub dataset: String,
    /// Raw salt-per-regeneration attribute, if present
    pub salt_per_regen: Option<String>,
}

/// One row of the consumption dataset:
/// `[date, regenCount, powerOutage, waterConsumption, saltAlarm]`
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionRow {
    pub date: String,
    pub regen_count: i64,
    pub power_outage: bool,
    pub water_consumption: i64,
    pub salt_alarm: bool,
}

/// Portal URLs derived from the configured base URL
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn login(&self) -> String {
        format!("{}/login", self.base)
    }

    pub fn dashboard(&self) -> String {
        format!("{}/dashboard", self.base)
    }

    pub fn summary(&self, device_key: &str) -> String {
        format!("{}/ajax/product-summary/{}", self.base, device_key)
    }

    pub fn device(&self, device_key: &str) -> String {
        format!("{}/device?receiptLineKey={}", self.base, device_key)
    }

    pub fn load_consumption(&self) -> String {
        format!("{}/_components/DeviceTabs/loadConso", self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_strip_trailing_slash() {
        let e = Endpoints::new("https://portal.example/");
        assert_eq!(e.login(), "https://portal.example/login");
        assert_eq!(
            e.summary("ABC"),
            "https://portal.example/ajax/product-summary/ABC"
        );
        assert_eq!(
            e.device("ABC"),
            "https://portal.example/device?receiptLineKey=ABC"
        );
        assert_eq!(
            e.load_consumption(),
            "https://portal.example/_components/DeviceTabs/loadConso"
        );
    }

    #[test]
    fn row_order_yaml_names() {
        let order: RowOrder = serde_yaml::from_str("by_date").unwrap();
        assert_eq!(order, RowOrder::ByDate);
        assert_eq!(serde_yaml::to_string(&RowOrder::NewestLast).unwrap().trim(), "newest_last");
    }
}
