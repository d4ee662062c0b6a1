// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session configuration.

use std::time::Duration;

use crate::Capabilities;
use crate::codec::udp::Credentials;
use crate::error::Error;
use crate::protocol::ProtocolMode;

/// Immutable configuration of one device session.
///
/// Built once before [`DeviceSession::start`](super::DeviceSession::start)
/// and never changed afterwards; reconfiguring means disposing the
/// session and starting a new one.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use avrelay_lib::session::SessionConfig;
///
/// let config = SessionConfig::telnet("192.168.1.50")
///     .with_polling_interval(Duration::from_secs(10));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    host: String,
    mode: ProtocolMode,
    telnet_port: u16,
    send_port: u16,
    receive_port: u16,
    credentials: Option<Credentials>,
    polling_interval: Duration,
    capabilities: Capabilities,
    queue_capacity: usize,
}

impl SessionConfig {
    /// Default telnet port of AV receivers.
    pub const DEFAULT_TELNET_PORT: u16 = 23;
    /// Default port relay boards listen on for commands.
    pub const DEFAULT_SEND_PORT: u16 = 75;
    /// Default port relay boards answer to.
    pub const DEFAULT_RECEIVE_PORT: u16 = 77;
    /// Default polling interval.
    pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(5);
    /// Default pending-command capacity.
    pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

    fn new(host: impl Into<String>, mode: ProtocolMode, capabilities: Capabilities) -> Self {
        Self {
            host: host.into(),
            mode,
            telnet_port: Self::DEFAULT_TELNET_PORT,
            send_port: Self::DEFAULT_SEND_PORT,
            receive_port: Self::DEFAULT_RECEIVE_PORT,
            credentials: None,
            polling_interval: Self::DEFAULT_POLLING_INTERVAL,
            capabilities,
            queue_capacity: Self::DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Creates a telnet receiver session configuration.
    #[must_use]
    pub fn telnet(host: impl Into<String>) -> Self {
        Self::new(host, ProtocolMode::Telnet, Capabilities::av_receiver())
    }

    /// Creates an HTTP-polling receiver session configuration.
    #[must_use]
    pub fn http_xml(host: impl Into<String>) -> Self {
        Self::new(host, ProtocolMode::HttpXml, Capabilities::av_receiver())
    }

    /// Creates a relay-board session configuration.
    #[must_use]
    pub fn udp(host: impl Into<String>) -> Self {
        Self::new(host, ProtocolMode::Udp, Capabilities::relay_board())
    }

    /// Sets the telnet port.
    #[must_use]
    pub fn with_telnet_port(mut self, port: u16) -> Self {
        self.telnet_port = port;
        self
    }

    /// Sets the board's command and answer ports. They may differ.
    #[must_use]
    pub fn with_udp_ports(mut self, send_port: u16, receive_port: u16) -> Self {
        self.send_port = send_port;
        self.receive_port = receive_port;
        self
    }

    /// Sets the credentials stamped into board write frames.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the polling interval. Polls run fixed-delay: the interval
    /// separates one cycle's end from the next one's start, so a slow
    /// cycle never overlaps the next.
    #[must_use]
    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    /// Sets the device capability set.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Sets the pending-command queue capacity.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Returns the device host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the protocol mode.
    #[must_use]
    pub fn mode(&self) -> ProtocolMode {
        self.mode
    }

    /// Returns the telnet port.
    #[must_use]
    pub fn telnet_port(&self) -> u16 {
        self.telnet_port
    }

    /// Returns the board's command port.
    #[must_use]
    pub fn send_port(&self) -> u16 {
        self.send_port
    }

    /// Returns the board's answer port.
    #[must_use]
    pub fn receive_port(&self) -> u16 {
        self.receive_port
    }

    /// Returns the board credentials, if configured.
    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Returns the polling interval.
    #[must_use]
    pub fn polling_interval(&self) -> Duration {
        self.polling_interval
    }

    /// Returns the capability set.
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Returns the pending-command queue capacity.
    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Checks the configuration for problems a session cannot start with.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` on an empty host or a zero polling
    /// interval.
    pub fn validate(&self) -> Result<(), Error> {
        if self.host.trim().is_empty() {
            return Err(Error::Configuration("host must not be empty".to_string()));
        }
        if self.polling_interval.is_zero() {
            return Err(Error::Configuration(
                "polling interval must not be zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telnet_defaults() {
        let config = SessionConfig::telnet("192.168.1.50");
        assert_eq!(config.mode(), ProtocolMode::Telnet);
        assert_eq!(config.telnet_port(), 23);
        assert_eq!(config.polling_interval(), Duration::from_secs(5));
        assert_eq!(config.capabilities().zones, 2);
    }

    #[test]
    fn udp_defaults() {
        let config = SessionConfig::udp("192.168.1.40");
        assert_eq!(config.mode(), ProtocolMode::Udp);
        assert_eq!(config.send_port(), 75);
        assert_eq!(config.receive_port(), 77);
        assert_eq!(config.capabilities().relays, 8);
    }

    #[test]
    fn builder_chain() {
        let config = SessionConfig::udp("h")
            .with_udp_ports(7500, 7700)
            .with_credentials(Credentials::new("user", "acct"))
            .with_queue_capacity(4);
        assert_eq!(config.send_port(), 7500);
        assert_eq!(config.receive_port(), 7700);
        assert!(config.credentials().is_some());
        assert_eq!(config.queue_capacity(), 4);
    }

    #[test]
    fn validate_rejects_empty_host() {
        assert!(SessionConfig::telnet("").validate().is_err());
        assert!(SessionConfig::telnet("  ").validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let config = SessionConfig::telnet("h").with_polling_interval(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
