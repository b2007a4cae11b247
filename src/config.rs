use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use config::{Config as ConfigLoader, Environment};
use is_terminal::IsTerminal;
use once_cell::sync::Lazy;
use serde::Deserialize;

const PREFIX: &str = "IPPROXY";

pub static CONFIG: Lazy<Config> = Lazy::new(|| init_config());

#[derive(Debug, Default)]
pub enum LogStyle {
    #[default]
    Auto,
    Always,
    Never,
}

impl LogStyle {
    pub fn is_color(&self) -> bool {
        match self {
            LogStyle::Auto => std::io::stdout().is_terminal(),
            LogStyle::Always => true,
            LogStyle::Never => false,
        }
    }
}

impl<'de> Deserialize<'de> for LogStyle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?.to_lowercase();
        match s.as_str() {
            "auto" => Ok(LogStyle::Auto),
            "always" => Ok(LogStyle::Always),
            "never" => Ok(LogStyle::Never),
            _ => Err(serde::de::Error::unknown_variant(
                &s,
                &["auto", "always", "never"],
            )),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct Log {
    pub level: String,
    pub style: LogStyle,
}

impl Default for Log {
    fn default() -> Self {
        Log {
            level: Self::level(),
            style: LogStyle::default(),
        }
    }
}

impl Log {
    fn level() -> String {
        String::from("ipproxy=info")
    }
}

/// Upstream geolocation service settings.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Provider {
    /// Host name used in client-facing messages, e.g. `ip-api.com`.
    pub name: String,
    pub base_url: String,
    /// Explicit field selection, sent as the `fields` query parameter.
    pub fields: String,
    pub timeout_ms: u64,
}

impl Default for Provider {
    fn default() -> Self {
        Self {
            name: String::from("ip-api.com"),
            base_url: String::from("http://ip-api.com/json"),
            // same selection as the numeric mask 33615865
            fields: String::from(
                "status,message,country,regionName,city,zip,lat,lon,timezone,offset,isp,org,as,query",
            ),
            timeout_ms: 3000,
        }
    }
}

impl Provider {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("provider name must be set".into());
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!(
                "provider base url must be an http(s) url: {}",
                self.base_url
            ));
        }
        if self.fields.trim().is_empty() {
            return Err("provider fields must not be empty".into());
        }
        if self.timeout_ms == 0 {
            return Err("provider timeout must be greater than zero".into());
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct Config {
    pub log: Log,
    pub addr: SocketAddr,
    pub cors: bool,
    /// Answer keepalive pings with `204 No Content` instead of a success body.
    pub keepalive_no_content: bool,
    /// Force every lookup to [`TEST_CLIENT_IP`]. Never enable in production.
    pub test_client_ip: bool,
    pub provider: Provider,
}

/// Documentation-range address (RFC 5737) used when `test_client_ip` is set.
pub const TEST_CLIENT_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 20));

impl Default for Config {
    fn default() -> Self {
        Config {
            log: Log::default(),
            addr: Self::addr(),
            cors: true,
            keepalive_no_content: false,
            test_client_ip: false,
            provider: Provider::default(),
        }
    }
}

impl Config {
    fn addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 3030)
    }

    pub fn client_ip_override(&self) -> Option<IpAddr> {
        self.test_client_ip.then_some(TEST_CLIENT_IP)
    }
}

pub fn init_config() -> Config {
    let config = ConfigLoader::builder()
        .add_source(
            Environment::with_prefix(PREFIX)
                .separator("_")
                .try_parsing(true),
        )
        .add_source(
            Environment::with_prefix(PREFIX)
                .separator("__")
                .prefix_separator("_")
                .try_parsing(true),
        )
        .build()
        .and_then(|cfg| cfg.try_deserialize::<Config>());

    match config {
        Ok(config) => {
            if let Err(err) = config.provider.validate() {
                panic!("{}", err);
            }
            println!("{:#?}", config);
            config
        }
        Err(err) => {
            panic!("{:?}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_provider_is_valid() {
        let provider = Provider::default();
        assert!(provider.validate().is_ok());
        assert_eq!(provider.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn provider_rejects_zero_timeout() {
        let provider = Provider {
            timeout_ms: 0,
            ..Provider::default()
        };
        assert!(provider.validate().is_err());
    }

    #[test]
    fn provider_rejects_non_http_url() {
        let provider = Provider {
            base_url: String::from("ftp://ip-api.com/json"),
            ..Provider::default()
        };
        let err = provider.validate().unwrap_err();
        assert!(err.contains("ftp://ip-api.com/json"));
    }

    #[test]
    fn override_only_when_enabled() {
        let mut config = Config::default();
        assert_eq!(config.client_ip_override(), None);
        config.test_client_ip = true;
        assert_eq!(
            config.client_ip_override(),
            Some("203.0.113.20".parse().unwrap())
        );
    }
}
