// ============================================================================
// Configuration - environment driven, loaded once at startup
// ============================================================================

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::admin::MAX_PROTOCOL_FEE_BPS;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:1234";
pub const DEFAULT_OWNER: &str = "owner";
pub const DEFAULT_PROTOCOL_FEE_BPS: u64 = 300;
pub const DEFAULT_STATE_PATH: &str = "data/state.json";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}={value:?} is not a valid {expected}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("CASTBET_PROTOCOL_FEE_BPS={0} exceeds the {1} bps maximum")]
    FeeTooHigh(u64, u64),

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub owner: String,
    pub protocol_fee_bps: u64,
    pub state_path: PathBuf,
    pub faucet_enabled: bool,
    /// Largest single faucet grant, in whole asset units
    pub faucet_limit: Decimal,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 1234)),
            owner: DEFAULT_OWNER.to_string(),
            protocol_fee_bps: DEFAULT_PROTOCOL_FEE_BPS,
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            faucet_enabled: true,
            faucet_limit: dec!(10000),
        }
    }
}

impl Config {
    /// Read the process environment (call `dotenv::dotenv()` first)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind_addr = match lookup("CASTBET_BIND_ADDR") {
            Some(value) => parse("CASTBET_BIND_ADDR", value, "socket address")?,
            None => defaults.bind_addr,
        };

        let owner = lookup("CASTBET_OWNER").unwrap_or(defaults.owner);
        if owner.trim().is_empty() {
            return Err(ConfigError::Empty("CASTBET_OWNER"));
        }

        let protocol_fee_bps = match lookup("CASTBET_PROTOCOL_FEE_BPS") {
            Some(value) => parse("CASTBET_PROTOCOL_FEE_BPS", value, "basis point integer")?,
            None => defaults.protocol_fee_bps,
        };
        if protocol_fee_bps > MAX_PROTOCOL_FEE_BPS {
            return Err(ConfigError::FeeTooHigh(protocol_fee_bps, MAX_PROTOCOL_FEE_BPS));
        }

        let state_path = lookup("CASTBET_STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.state_path);

        let faucet_enabled = match lookup("CASTBET_FAUCET_ENABLED") {
            Some(value) => parse_flag("CASTBET_FAUCET_ENABLED", value)?,
            None => defaults.faucet_enabled,
        };

        let faucet_limit: Decimal = match lookup("CASTBET_FAUCET_LIMIT") {
            Some(value) => parse("CASTBET_FAUCET_LIMIT", value, "decimal amount")?,
            None => defaults.faucet_limit,
        };
        if faucet_limit.is_sign_negative() {
            return Err(ConfigError::Invalid {
                var: "CASTBET_FAUCET_LIMIT",
                value: faucet_limit.to_string(),
                expected: "non-negative decimal amount",
            });
        }

        Ok(Self {
            bind_addr,
            owner,
            protocol_fee_bps,
            state_path,
            faucet_enabled,
            faucet_limit,
        })
    }
}

fn parse<T: FromStr>(var: &'static str, value: String, expected: &'static str) -> Result<T, ConfigError> {
    let parsed = value.trim().parse();
    parsed.map_err(|_| ConfigError::Invalid { var, value, expected })
}

fn parse_flag(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { var, value, expected: "boolean" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(config_from(&[]).unwrap(), Config::default());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("CASTBET_BIND_ADDR", "127.0.0.1:8080"),
            ("CASTBET_OWNER", "treasury"),
            ("CASTBET_PROTOCOL_FEE_BPS", "150"),
            ("CASTBET_FAUCET_ENABLED", "off"),
            ("CASTBET_FAUCET_LIMIT", "250.5"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.owner, "treasury");
        assert_eq!(config.protocol_fee_bps, 150);
        assert!(!config.faucet_enabled);
        assert_eq!(config.faucet_limit, dec!(250.5));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert_eq!(
            config_from(&[("CASTBET_PROTOCOL_FEE_BPS", "900")]),
            Err(ConfigError::FeeTooHigh(900, 500))
        );
        assert!(matches!(
            config_from(&[("CASTBET_BIND_ADDR", "nowhere")]),
            Err(ConfigError::Invalid { var: "CASTBET_BIND_ADDR", .. })
        ));
        assert!(config_from(&[("CASTBET_FAUCET_ENABLED", "maybe")]).is_err());
        assert!(config_from(&[("CASTBET_FAUCET_LIMIT", "-1")]).is_err());
        assert_eq!(config_from(&[("CASTBET_OWNER", " ")]), Err(ConfigError::Empty("CASTBET_OWNER")));
    }
}
