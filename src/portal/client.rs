use super::PortalApi;
use super::scrape;
use super::types::{Endpoints, RowOrder};
use crate::config::{AccountConfig, PortalConfig};
use crate::error::{PerlaError, Result};
use crate::logging::{LogContext, get_logger_with_context};
use crate::sensors::SensorRecord;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

const LIVE_COMPONENT_MIME: &str = "application/vnd.live-component+html";
const CLIENT_AGENT: &str = concat!("perla-bridge/", env!("CARGO_PKG_VERSION"));

/// Where the client is in its login lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated { device_key: String },
    Closed,
}

/// Cookie-session client for the vendor portal.
///
/// Owns its own HTTP client and cookie jar; a fresh jar is created on every
/// login so a stale session never leaks into the next one.
pub struct PortalClient {
    http: Option<Client>,
    endpoints: Endpoints,
    account: AccountConfig,
    connect_timeout: Duration,
    request_timeout: Duration,
    row_order: RowOrder,
    state: SessionState,
    logger: crate::logging::StructuredLogger,
}

impl PortalClient {
    /// Create a new client; no network traffic until `authenticate`
    pub fn new(account: AccountConfig, portal: &PortalConfig) -> Self {
        let logger = get_logger_with_context(
            LogContext::new("portal").with_field("serial", account.serial_number.clone()),
        );
        Self {
            http: None,
            endpoints: Endpoints::new(&portal.base_url),
            account,
            connect_timeout: Duration::from_secs(portal.connect_timeout_secs),
            request_timeout: Duration::from_secs(portal.request_timeout_secs),
            row_order: portal.row_order,
            state: SessionState::Unauthenticated,
            logger,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn build_http(&self) -> Result<Client> {
        Client::builder()
            .cookie_store(true)
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| PerlaError::connection(format!("Failed to build HTTP client: {}", e)))
    }

    fn http(&self) -> Result<&Client> {
        if self.state == SessionState::Closed {
            return Err(PerlaError::connection("session closed"));
        }
        self.http
            .as_ref()
            .ok_or_else(|| PerlaError::auth("not authenticated"))
    }

    /// Shared 401/403 handling: drop to Unauthenticated and report an auth error
    fn check_auth(&mut self, resp: &Response, what: &str) -> Result<()> {
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.invalidate();
            return Err(PerlaError::auth(format!(
                "Session expired while fetching {} ({})",
                what, status
            )));
        }
        Ok(())
    }

    fn check_ok(resp: &Response, what: &str) -> Result<()> {
        if resp.status() != StatusCode::OK {
            return Err(PerlaError::api(format!(
                "{} request failed with status {}",
                what,
                resp.status()
            )));
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        if self.state != SessionState::Closed {
            self.state = SessionState::Unauthenticated;
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder, what: &str) -> Result<Response> {
        req.header(USER_AGENT, CLIENT_AGENT)
            .send()
            .await
            .map_err(|e| PerlaError::connection(format!("Cannot fetch {}: {}", what, e)))
    }

    async fn read_text(resp: Response, what: &str) -> Result<String> {
        resp.text()
            .await
            .map_err(|e| PerlaError::connection(format!("Cannot read {}: {}", what, e)))
    }
}

#[async_trait::async_trait]
impl PortalApi for PortalClient {
    async fn authenticate(&mut self) -> Result<String> {
        if self.state == SessionState::Closed {
            return Err(PerlaError::connection("session closed"));
        }
        // Anything that fails below leaves the client logged out
        self.state = SessionState::Unauthenticated;
        self.http = None;
        let http = self.build_http()?;

        let login = http.post(self.endpoints.login()).form(&[
            ("_username", self.account.username.as_str()),
            ("_password", self.account.password.as_str()),
        ]);
        let resp = self.send(login, "login").await?;
        match resp.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(PerlaError::auth("Authentication failed: invalid credentials"));
            }
            status => {
                return Err(PerlaError::api(format!(
                    "Unexpected status {} during login",
                    status
                )));
            }
        }
        self.logger.info("Portal login successful");

        let resp = self.send(http.get(self.endpoints.dashboard()), "dashboard").await?;
        self.check_auth(&resp, "dashboard")?;
        Self::check_ok(&resp, "Dashboard")?;
        let html = Self::read_text(resp, "dashboard").await?;

        let Some(device_key) = scrape::find_device_key(&html, &self.account.serial_number)? else {
            return Err(PerlaError::api(format!(
                "device not found: serial number {} is not listed on the dashboard",
                self.account.serial_number
            )));
        };

        self.logger.info(&format!("Device key found: {}", device_key));
        self.http = Some(http);
        self.state = SessionState::Authenticated {
            device_key: device_key.clone(),
        };
        Ok(device_key)
    }

    async fn fetch_status(&mut self, device_key: &str) -> Result<SensorRecord> {
        let req = self.http()?.get(self.endpoints.summary(device_key));
        let resp = self.send(req, "main data").await?;
        self.check_auth(&resp, "main data")?;
        Self::check_ok(&resp, "Main data")?;

        let text = Self::read_text(resp, "main data").await?;
        let body: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| PerlaError::api(format!("Main data is not valid JSON: {}", e)))?;

        let record = scrape::parse_status(&body);
        self.logger.debug(&format!("Main data retrieved: {} values", record.len()));
        Ok(record)
    }

    async fn fetch_consumption(&mut self, device_key: &str) -> Result<SensorRecord> {
        // Step 1: device page carries the live component props
        let req = self.http()?.get(self.endpoints.device(device_key));
        let resp = self.send(req, "device page").await?;
        self.check_auth(&resp, "device page")?;
        Self::check_ok(&resp, "Device page")?;
        let html = Self::read_text(resp, "device page").await?;

        let Some(props) = scrape::extract_live_props(&html)? else {
            return Err(PerlaError::api("live marker not found on device page"));
        };
        let envelope = scrape::build_refresh_envelope(&props)?;

        // Step 2: ask the component to re-render its consumption tab
        let req = self
            .http()?
            .post(self.endpoints.load_consumption())
            .header(ACCEPT, LIVE_COMPONENT_MIME)
            .form(&[("data", envelope.as_str())]);
        let resp = self.send(req, "consumption data").await?;
        self.check_auth(&resp, "consumption data")?;
        Self::check_ok(&resp, "Consumption data")?;
        let fragment = Self::read_text(resp, "consumption data").await?;

        let Some(chart) = scrape::extract_chart(&fragment)? else {
            self.logger.debug("No consumption chart on device yet");
            return Ok(SensorRecord::new());
        };

        let record = scrape::parse_consumption(&chart, self.row_order)?;
        self.logger.debug(&format!("Consumption data retrieved: {} values", record.len()));
        Ok(record)
    }

    fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        // Dropping the client tears down pooled connections; requests already
        // in flight hold their own handle and finish or time out on their own.
        self.http = None;
        self.state = SessionState::Closed;
        self.logger.info("Portal session closed");
    }
}
