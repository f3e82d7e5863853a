//! # Firmware Version Check
//!
//! The vendor app asks the vendor backend whether newer firmware exists:
//!
//! ```text
//! POST http://app.nelko.net/api/firmware/verify
//! Content-Type: application/json
//!
//! {"hardwareName":"0.0.3","dev":"P21","firmwareName":"4.2.4"}
//! ```
//!
//! Only the check is implemented. The reply has no documented schema, so it
//! is returned as text. Nothing is downloaded or flashed.

use log::{debug, info};
use serde::Serialize;

use crate::error::NelkoError;
use crate::printer::PrinterConfig;
use crate::protocol::response::ConfigStatus;

/// Vendor firmware check endpoint (plain HTTP).
pub const FIRMWARE_VERIFY_URL: &str = "http://app.nelko.net/api/firmware/verify";

/// JSON body of a firmware check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirmwareQuery {
    pub hardware_name: String,
    pub dev: String,
    pub firmware_name: String,
}

impl FirmwareQuery {
    pub fn new(hardware_name: impl Into<String>, firmware_name: impl Into<String>) -> Self {
        Self {
            hardware_name: hardware_name.into(),
            dev: PrinterConfig::P21.model.to_string(),
            firmware_name: firmware_name.into(),
        }
    }

    /// Build the query from a CONFIG? reply.
    pub fn from_config(config: &ConfigStatus) -> Self {
        Self::new(config.hardware_version(), config.firmware_version())
    }
}

/// HTTP client for firmware checks.
pub fn client() -> Result<reqwest::Client, NelkoError> {
    reqwest::Client::builder()
        .user_agent(concat!("nelko/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| NelkoError::Http(format!("HTTP client error: {}", e)))
}

/// POST `query` to `url` and return the response body.
pub async fn check_firmware(
    client: &reqwest::Client,
    url: &str,
    query: &FirmwareQuery,
) -> Result<String, NelkoError> {
    info!(
        "Checking firmware for {} (hw {}, fw {})",
        query.dev, query.hardware_name, query.firmware_name
    );
    let response = client
        .post(url)
        .json(query)
        .send()
        .await
        .map_err(|e| NelkoError::Http(format!("Firmware check to {} failed: {}", url, e)))?;

    let status = response.status();
    let body = response.text().await?;
    debug!("Firmware check reply ({}): {}", status, body);

    if !status.is_success() {
        return Err(NelkoError::Http(format!("Firmware check failed: HTTP {}", status)));
    }
    Ok(body)
}
