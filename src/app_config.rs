use crate::client::ClientConfig;
use crate::domain::Waypoint;
use config::{Config, ConfigError};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    server: Server,
    #[serde(default)]
    client: Option<ClientConfig>,
    #[serde(default)]
    directory: Directory,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(config::File::with_name("config_local").required(false))
            .add_source(config::Environment::with_prefix("WAYPOINTS").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    /// Where a [`crate::client::DirectoryClient`] finds a remote directory, if configured.
    pub fn client(&self) -> Option<&ClientConfig> {
        self.client.as_ref()
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    host: String,
    port: u16,
    #[serde(with = "humantime_serde")]
    read_timeout: Duration,
}

impl Server {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

/// Waypoints the directory starts out with, in enumeration order.
#[derive(Debug, Default, Deserialize)]
pub struct Directory {
    #[serde(default)]
    waypoints: Vec<Waypoint>,
}

impl Directory {
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }
}

#[cfg(test)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn new() -> Self {
        AppConfigBuilder {
            config: AppConfig {
                server: Server {
                    host: "127.0.0.1".to_string(),
                    port: 0,
                    read_timeout: Duration::from_secs(30),
                },
                client: None,
                directory: Directory::default(),
            },
        }
    }

    pub fn waypoints(mut self, waypoints: Vec<Waypoint>) -> Self {
        self.config.directory.waypoints = waypoints;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::server::bind;
    use config::{File, FileFormat};
    use pretty_assertions::assert_eq;

    const TOML: &str = r#"
        [server]
        host = "0.0.0.0"
        port = 8080
        read_timeout = "15s"

        [client]
        url = "http://10.0.0.2:8080"
        retry_ms = 250
        retry_max_delay_ms = 4000
        max_retries = 5
        timeout = "3s"

        [[directory.waypoints]]
        name = "Camp"
        lat = 40.0
        lon = -105
        ele = 2500.0

        [[directory.waypoints]]
        name = "Summit"
        latitude = 40.1
        longitude = -105.1
        elevation = 4000
    "#;

    fn from_toml(toml: &str) -> Result<AppConfig, ConfigError> {
        Config::builder().add_source(File::from_str(toml, FileFormat::Toml)).build()?.try_deserialize()
    }

    #[test]
    fn deserializes_server_settings() -> Result<(), ConfigError> {
        let config = from_toml(TOML)?;

        assert_eq!(config.server().host(), "0.0.0.0");
        assert_eq!(config.server().port(), 8080);
        assert_eq!(config.server().read_timeout(), Duration::from_secs(15));
        Ok(())
    }

    #[test]
    fn deserializes_seed_waypoints_in_order() -> Result<(), ConfigError> {
        let config = from_toml(TOML)?;

        assert_eq!(
            config.directory().waypoints(),
            &[Waypoint::new("Camp", 40.0, -105.0, 2500.0), Waypoint::new("Summit", 40.1, -105.1, 4000.0)]
        );
        Ok(())
    }

    #[test]
    fn deserializes_client_settings() -> Result<(), ConfigError> {
        let config = from_toml(TOML)?;

        let client = config.client().ok_or_else(|| ConfigError::NotFound("client".to_string()))?;
        assert_eq!(client.url(), "http://10.0.0.2:8080");
        assert_eq!(client.retry_max_delay(), Duration::from_secs(4));
        assert_eq!(client.timeout(), Duration::from_secs(3));
        Ok(())
    }

    #[test]
    fn the_client_and_directory_sections_are_optional() -> Result<(), ConfigError> {
        let config = from_toml("[server]\nhost = \"localhost\"\nport = 1\nread_timeout = \"1m\"")?;

        assert!(config.client().is_none());
        assert!(config.directory().waypoints().is_empty());
        Ok(())
    }

    #[test]
    fn fails_without_a_server_section() {
        assert!(from_toml("").is_err());
    }

    #[tokio::test]
    async fn bind_uses_the_configured_address() -> std::io::Result<()> {
        let config = AppConfigBuilder::new().waypoints(vec![Waypoint::new("Camp", 40.0, -105.0, 2500.0)]).build();

        let listener = bind(&config).await?;

        assert!(listener.local_addr()?.ip().is_loopback());
        assert_eq!(config.directory().waypoints().len(), 1);
        Ok(())
    }
}
