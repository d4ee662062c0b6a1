// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP client for receivers with a web interface.
//!
//! Stateless: each poll fetches one zone status document, each command
//! is one GET carrying the telnet-grammar command string. The reusable
//! reqwest client is created lazily on first use and kept for the
//! session's lifetime.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::codec::xml;
use crate::error::ProtocolError;
use crate::types::Zone;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for polling a receiver's XML status documents.
///
/// # Examples
///
/// ```no_run
/// use avrelay_lib::protocol::HttpXmlClient;
/// use avrelay_lib::types::Zone;
///
/// # async fn example() -> avrelay_lib::Result<()> {
/// let client = HttpXmlClient::new("192.168.1.50")?;
/// let xml = client.fetch_zone_status(Zone::Main).await?;
/// client.send_command("PWON").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpXmlClient {
    base_url: String,
    client: Client,
}

impl HttpXmlClient {
    /// Creates a client for the given host with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Http` if the client cannot be created.
    pub fn new(host: impl Into<String>) -> Result<Self, ProtocolError> {
        Self::with_timeout(host, DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Http` if the client cannot be created.
    pub fn with_timeout(host: impl Into<String>, timeout: Duration) -> Result<Self, ProtocolError> {
        let host = host.into();
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("http://{host}")
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProtocolError::Http)?;

        Ok(Self { base_url, client })
    }

    /// Returns the base URL of the device.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the raw status document for a zone.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::AuthenticationFailed` on 401,
    /// `ProtocolError::InsufficientRights` on 403, and
    /// `ProtocolError::Http`/`ConnectionFailed` for transport failures
    /// and other non-success statuses.
    pub async fn fetch_zone_status(&self, zone: Zone) -> Result<String, ProtocolError> {
        self.get(&xml::zone_status_path(zone)).await
    }

    /// Sends a telnet-grammar command string via the web interface.
    ///
    /// # Errors
    ///
    /// Same failure mapping as [`fetch_zone_status`](Self::fetch_zone_status).
    pub async fn send_command(&self, command: &str) -> Result<(), ProtocolError> {
        self.get(&xml::command_path(command)).await.map(|_| ())
    }

    async fn get(&self, path: &str) -> Result<String, ProtocolError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "HTTP GET");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ProtocolError::Http)?;

        match response.status() {
            reqwest::StatusCode::UNAUTHORIZED => Err(ProtocolError::AuthenticationFailed),
            reqwest::StatusCode::FORBIDDEN => Err(ProtocolError::InsufficientRights),
            status if !status.is_success() => Err(ProtocolError::ConnectionFailed(format!(
                "HTTP {} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ))),
            _ => response.text().await.map_err(ProtocolError::Http),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_normalization() {
        let client = HttpXmlClient::new("192.168.1.50").unwrap();
        assert_eq!(client.base_url(), "http://192.168.1.50");

        let client = HttpXmlClient::new("https://192.168.1.50").unwrap();
        assert_eq!(client.base_url(), "https://192.168.1.50");
    }

    #[test]
    fn custom_timeout_accepted() {
        assert!(HttpXmlClient::with_timeout("h", Duration::from_secs(1)).is_ok());
    }
}
