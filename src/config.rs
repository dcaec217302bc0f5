//! Client configuration.
//!
//! [`ClientConfig`] is built in code with `with_*` methods. With the `config`
//! feature enabled, [`ClientSettings`] reads the same values from TOML:
//!
//! ```toml
//! local_addr = "0.0.0.0:9600"
//! plc_addr = "192.168.1.250:9600"
//! timeout_ms = 500
//! source_node = 0x22
//! dest_node = 0
//! match_sid = true
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::header::NodeAddress;
use crate::transport::{DEFAULT_FINS_PORT, DEFAULT_TIMEOUT};

/// Local port bound when none is configured.
pub const DEFAULT_LOCAL_PORT: u16 = 9600;

/// Configuration for creating a FINS client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Local address the datagram endpoint binds to.
    pub local_addr: SocketAddr,
    /// PLC socket address.
    pub plc_addr: SocketAddr,
    /// Source node address (this client).
    pub source: NodeAddress,
    /// Destination node address (the PLC).
    pub destination: NodeAddress,
    /// Response timeout.
    pub timeout: Duration,
    /// Accept only responses that echo the command's SID.
    pub match_sid: bool,
}

impl ClientConfig {
    /// Creates a configuration for the PLC at `plc_ip`.
    ///
    /// Defaults: PLC port 9600, local endpoint `0.0.0.0:9600`, 2 s timeout,
    /// source node `0x22`, destination node 0, SID matching on.
    ///
    /// # Example
    ///
    /// ```
    /// use fins_udp::ClientConfig;
    /// use std::net::Ipv4Addr;
    ///
    /// let config = ClientConfig::new(Ipv4Addr::new(192, 168, 1, 250));
    /// assert_eq!(config.plc_addr.port(), 9600);
    /// assert_eq!(config.source.node, 0x22);
    /// ```
    pub fn new(plc_ip: impl Into<IpAddr>) -> Self {
        Self {
            local_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_LOCAL_PORT)),
            plc_addr: SocketAddr::new(plc_ip.into(), DEFAULT_FINS_PORT),
            source: NodeAddress::client_default(),
            destination: NodeAddress::local(),
            timeout: DEFAULT_TIMEOUT,
            match_sid: true,
        }
    }

    /// Sets a custom PLC port (default is 9600).
    pub fn with_port(mut self, port: u16) -> Self {
        self.plc_addr.set_port(port);
        self
    }

    /// Sets the local address to bind.
    ///
    /// # Example
    ///
    /// ```
    /// use fins_udp::ClientConfig;
    /// use std::net::Ipv4Addr;
    ///
    /// let config = ClientConfig::new(Ipv4Addr::new(192, 168, 1, 250))
    ///     .with_local_addr("192.168.1.20:9601".parse().unwrap());
    /// assert_eq!(config.local_addr.port(), 9601);
    /// ```
    pub fn with_local_addr(mut self, local_addr: SocketAddr) -> Self {
        self.local_addr = local_addr;
        self
    }

    /// Sets only the local port, keeping the local IP.
    pub fn with_local_port(mut self, port: u16) -> Self {
        self.local_addr.set_port(port);
        self
    }

    /// Sets a custom timeout (default is 2 seconds).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the timeout in milliseconds.
    pub fn with_timeout_ms(self, timeout_ms: u64) -> Self {
        self.with_timeout(Duration::from_millis(timeout_ms))
    }

    /// Sets the source (client) node address.
    pub fn with_source(mut self, source: NodeAddress) -> Self {
        self.source = source;
        self
    }

    /// Sets the source node number, keeping network and unit.
    pub fn with_source_node(mut self, node: u8) -> Self {
        self.source.node = node;
        self
    }

    /// Sets the destination (PLC) node address.
    pub fn with_destination(mut self, destination: NodeAddress) -> Self {
        self.destination = destination;
        self
    }

    /// Sets the destination node number, keeping network and unit.
    pub fn with_dest_node(mut self, node: u8) -> Self {
        self.destination.node = node;
        self
    }

    /// Enables or disables SID matching of responses.
    ///
    /// With matching on, a response is accepted only if it echoes the
    /// command's SID and comes from the destination node addressed to the
    /// source node; anything else is dropped and the wait goes on. A datagram
    /// shorter than 14 bytes cannot be correlated and still ends the exchange
    /// with `MalformedFrame`, even if the real reply would have followed.
    ///
    /// With matching off, the first datagram that arrives is taken as the
    /// response.
    pub fn with_sid_matching(mut self, enabled: bool) -> Self {
        self.match_sid = enabled;
        self
    }
}

#[cfg(feature = "config")]
pub use settings::ClientSettings;

#[cfg(feature = "config")]
mod settings {
    use std::net::{Ipv4Addr, SocketAddr};
    use std::time::Duration;

    use serde::{Deserialize, Serialize};

    use super::{ClientConfig, DEFAULT_LOCAL_PORT};
    use crate::error::{FinsError, Result};
    use crate::header::{NodeAddress, DEFAULT_SOURCE_NODE};
    use crate::transport::DEFAULT_TIMEOUT;

    fn default_local_addr() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_LOCAL_PORT))
    }

    fn default_timeout_ms() -> u64 {
        DEFAULT_TIMEOUT.as_millis() as u64
    }

    fn default_source_node() -> u8 {
        DEFAULT_SOURCE_NODE
    }

    fn default_true() -> bool {
        true
    }

    /// Serializable form of [`ClientConfig`].
    ///
    /// Only `plc_addr` is required; every other field takes the
    /// `ClientConfig` default.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ClientSettings {
        /// Local address to bind.
        #[serde(default = "default_local_addr")]
        pub local_addr: SocketAddr,
        /// PLC socket address.
        pub plc_addr: SocketAddr,
        /// Response timeout in milliseconds.
        #[serde(default = "default_timeout_ms")]
        pub timeout_ms: u64,
        /// Source network address.
        #[serde(default)]
        pub source_network: u8,
        /// Source node address.
        #[serde(default = "default_source_node")]
        pub source_node: u8,
        /// Source unit address.
        #[serde(default)]
        pub source_unit: u8,
        /// Destination network address.
        #[serde(default)]
        pub dest_network: u8,
        /// Destination node address.
        #[serde(default)]
        pub dest_node: u8,
        /// Destination unit address.
        #[serde(default)]
        pub dest_unit: u8,
        /// Accept only responses echoing the command SID.
        #[serde(default = "default_true")]
        pub match_sid: bool,
    }

    impl ClientSettings {
        /// Parses settings from a TOML document.
        ///
        /// # Errors
        ///
        /// Returns `FinsError::InvalidParameter` naming `config` if the
        /// document does not parse.
        pub fn from_toml_str(s: &str) -> Result<Self> {
            toml::from_str(s).map_err(|e| FinsError::invalid_parameter("config", e.to_string()))
        }

        /// Renders the settings as TOML.
        pub fn to_toml_string(&self) -> Result<String> {
            toml::to_string(self).map_err(|e| FinsError::invalid_parameter("config", e.to_string()))
        }
    }

    impl From<ClientSettings> for ClientConfig {
        fn from(s: ClientSettings) -> Self {
            ClientConfig {
                local_addr: s.local_addr,
                plc_addr: s.plc_addr,
                source: NodeAddress::new(s.source_network, s.source_node, s.source_unit),
                destination: NodeAddress::new(s.dest_network, s.dest_node, s.dest_unit),
                timeout: Duration::from_millis(s.timeout_ms),
                match_sid: s.match_sid,
            }
        }
    }

    impl From<&ClientConfig> for ClientSettings {
        fn from(c: &ClientConfig) -> Self {
            ClientSettings {
                local_addr: c.local_addr,
                plc_addr: c.plc_addr,
                timeout_ms: c.timeout.as_millis() as u64,
                source_network: c.source.network,
                source_node: c.source.node,
                source_unit: c.source.unit,
                dest_network: c.destination.network,
                dest_node: c.destination.node,
                dest_unit: c.destination.unit,
                match_sid: c.match_sid,
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_new() {
        let config = ClientConfig::new(Ipv4Addr::new(192, 168, 1, 250));

        assert_eq!(config.plc_addr.ip(), IpAddr::from(Ipv4Addr::new(192, 168, 1, 250)));
        assert_eq!(config.plc_addr.port(), DEFAULT_FINS_PORT);
        assert_eq!(config.local_addr.port(), DEFAULT_LOCAL_PORT);
        assert_eq!(config.source, NodeAddress::new(0, 0x22, 0));
        assert_eq!(config.destination, NodeAddress::local());
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.match_sid);
    }

    #[test]
    fn test_client_config_builders() {
        let config = ClientConfig::new(Ipv4Addr::new(192, 168, 1, 250))
            .with_port(9601)
            .with_local_port(9700)
            .with_timeout_ms(50)
            .with_source_node(3)
            .with_dest_node(10)
            .with_sid_matching(false);

        assert_eq!(config.plc_addr.port(), 9601);
        assert_eq!(config.local_addr.port(), 9700);
        assert_eq!(config.timeout, Duration::from_millis(50));
        assert_eq!(config.source.node, 3);
        assert_eq!(config.destination.node, 10);
        assert!(!config.match_sid);
    }

    #[test]
    fn test_client_config_full_addresses() {
        let config = ClientConfig::new(Ipv4Addr::LOCALHOST)
            .with_source(NodeAddress::new(1, 2, 3))
            .with_destination(NodeAddress::new(4, 5, 6));
        assert_eq!(config.source, NodeAddress::new(1, 2, 3));
        assert_eq!(config.destination, NodeAddress::new(4, 5, 6));
    }
}
