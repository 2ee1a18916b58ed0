use crate::error::{Result, SignalingError};
use crate::signaling::SignalingOptions;
use crate::transport::TransportConfig;
use screenwatch_core::IceServerConfig;
use std::time::Duration;

pub const ENV_TURN_URL: &str = "SCREENWATCH_TURN_URL";
pub const ENV_TURN_USERNAME: &str = "SCREENWATCH_TURN_USERNAME";
pub const ENV_TURN_CREDENTIAL: &str = "SCREENWATCH_TURN_CREDENTIAL";
pub const ENV_NEGOTIATION_TIMEOUT_MS: &str = "SCREENWATCH_NEGOTIATION_TIMEOUT_MS";
pub const ENV_THROTTLE_WINDOW_MS: &str = "SCREENWATCH_THROTTLE_WINDOW_MS";

/// Tunables of one signaling session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Minimum spacing between two broadcast start attempts.
    pub throttle_window: Duration,
    /// Start attempts allowed inside one throttle window.
    pub max_start_attempts: u32,
    /// Delay before an observer nudges the broadcaster for an offer after joining.
    pub offer_request_delay: Duration,
    /// Upper bound for a `Starting` or `Connecting` sequence.
    pub negotiation_timeout: Duration,
    pub signaling: SignalingOptions,
    pub transport: TransportConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            throttle_window: Duration::from_millis(5000),
            max_start_attempts: 1,
            offer_request_delay: Duration::from_millis(1000),
            negotiation_timeout: Duration::from_secs(15),
            signaling: SignalingOptions::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `SCREENWATCH_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = lookup(ENV_NEGOTIATION_TIMEOUT_MS) {
            config.negotiation_timeout = parse_millis(ENV_NEGOTIATION_TIMEOUT_MS, &ms)?;
        }
        if let Some(ms) = lookup(ENV_THROTTLE_WINDOW_MS) {
            config.throttle_window = parse_millis(ENV_THROTTLE_WINDOW_MS, &ms)?;
        }

        if let Some(urls) = lookup(ENV_TURN_URL) {
            let username = lookup(ENV_TURN_USERNAME);
            let credential = lookup(ENV_TURN_CREDENTIAL);
            if username.is_none() || credential.is_none() {
                return Err(SignalingError::config(format!(
                    "{ENV_TURN_URL} requires {ENV_TURN_USERNAME} and {ENV_TURN_CREDENTIAL}"
                )));
            }

            config.transport.ice_servers.push(IceServerConfig {
                urls: turn_transport_variants(&urls),
                username,
                credential,
            });
        }

        Ok(config)
    }
}

fn parse_millis(key: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| SignalingError::config(format!("{key}={value:?}: {e}")))
}

/// Expands each TURN url into its UDP and TCP variants unless a transport is already pinned.
fn turn_transport_variants(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .flat_map(|url| {
            if url.contains('?') {
                vec![url.to_owned()]
            } else {
                vec![
                    format!("{url}?transport=udp"),
                    format!("{url}?transport=tcp"),
                ]
            }
        })
        .collect()
}
