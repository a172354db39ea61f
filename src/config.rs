//! Gate configuration.
//!
//! A WASM bundle has no process environment at runtime, so values are
//! captured at build time with `option_env!` and parsed through the same
//! lookup path tests use.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use crate::error::ConfigError;
use crate::state::wallet::NetworkId;

pub const DEFAULT_HOME_ROUTE: &str = "/";
pub const DEFAULT_VERIFY_ENDPOINT: &str = "/api/auth/challenge/verify";

pub const NETWORK_KEY: &str = "CROSSPOST_NETWORK";
pub const SESSION_TTL_KEY: &str = "CROSSPOST_SESSION_TTL_SECS";
pub const HOME_ROUTE_KEY: &str = "CROSSPOST_HOME_ROUTE";
pub const VERIFY_ENDPOINT_KEY: &str = "CROSSPOST_VERIFY_ENDPOINT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Network the wallet connects to on mount.
    pub network: NetworkId,
    /// How long a signed challenge keeps the account authorized.
    /// `None` means until disconnect, account switch, or logout.
    pub session_ttl: Option<Duration>,
    /// Where guards send navigation they refuse.
    pub home_route: String,
    /// Backend endpoint that verifies signed challenges.
    pub verify_endpoint: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            network: NetworkId::Testnet,
            session_ttl: None,
            home_route: DEFAULT_HOME_ROUTE.to_owned(),
            verify_endpoint: DEFAULT_VERIFY_ENDPOINT.to_owned(),
        }
    }
}

impl GateConfig {
    /// Build config from a key lookup.
    ///
    /// Optional:
    /// - `CROSSPOST_NETWORK`: `testnet` (default) or `mainnet`
    /// - `CROSSPOST_SESSION_TTL_SECS`: `0` or absent disables expiry
    /// - `CROSSPOST_HOME_ROUTE`: default `/`
    /// - `CROSSPOST_VERIFY_ENDPOINT`: default `/api/auth/challenge/verify`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an unknown network or a TTL that is not a
    /// whole number of seconds.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let network = match lookup(NETWORK_KEY) {
            Some(raw) => raw.parse::<NetworkId>()?,
            None => defaults.network,
        };
        let session_ttl = parse_ttl(lookup(SESSION_TTL_KEY).as_deref())?;
        let home_route = lookup(HOME_ROUTE_KEY)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.home_route);
        let verify_endpoint = lookup(VERIFY_ENDPOINT_KEY)
            .map(|v| v.trim().trim_end_matches('/').to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.verify_endpoint);

        Ok(Self { network, session_ttl, home_route, verify_endpoint })
    }

    /// Build config from values baked in at compile time.
    ///
    /// # Errors
    ///
    /// Same as [`GateConfig::from_lookup`].
    pub fn from_build_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| {
            let value = match key {
                NETWORK_KEY => option_env!("CROSSPOST_NETWORK"),
                SESSION_TTL_KEY => option_env!("CROSSPOST_SESSION_TTL_SECS"),
                HOME_ROUTE_KEY => option_env!("CROSSPOST_HOME_ROUTE"),
                VERIFY_ENDPOINT_KEY => option_env!("CROSSPOST_VERIFY_ENDPOINT"),
                _ => None,
            };
            value.map(str::to_owned)
        })
    }
}

fn parse_ttl(raw: Option<&str>) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = raw.map(str::trim) else {
        return Ok(None);
    };
    let secs = raw
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidValue { key: SESSION_TTL_KEY, value: raw.to_owned() })?;
    Ok((secs > 0).then_some(Duration::from_secs(secs)))
}
