use crate::auth::AuthPolicy;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::str::FromStr;

pub const ENV_LISTEN_ADDR: &str = "DUTCH_LISTEN_ADDR";
pub const ENV_AUTH_POLICY: &str = "DUTCH_AUTH_POLICY";
pub const ENV_LOG: &str = "DUTCH_LOG";
pub const ENV_EVENT_BATCH: &str = "DUTCH_EVENT_BATCH";

/// Settings of the auction host binary
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub auth_policy: AuthPolicy,
    /// `tracing_subscriber::EnvFilter` directives
    pub log: String,
    /// How many events the event tail handles per iteration
    pub event_batch: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            auth_policy: AuthPolicy::default(),
            log: "info".to_owned(),
            event_batch: 16,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Start from defaults and override whatever `lookup` knows about
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = parse_var::<SocketAddr>(&lookup, ENV_LISTEN_ADDR)? {
            config.listen_addr = addr;
        }
        if let Some(policy) = lookup(ENV_AUTH_POLICY) {
            config.auth_policy = policy
                .parse()
                .with_context(|| format!("invalid {ENV_AUTH_POLICY}"))?;
            // callers name themselves in request bodies, nothing vouches for them
            anyhow::ensure!(
                config.auth_policy != AuthPolicy::Principal,
                "{ENV_AUTH_POLICY}=principal is not supported by the http host"
            );
        }
        if let Some(log) = lookup(ENV_LOG) {
            config.log = log;
        }
        if let Some(batch) = parse_var::<usize>(&lookup, ENV_EVENT_BATCH)? {
            anyhow::ensure!(batch > 0, "{ENV_EVENT_BATCH} must be positive");
            config.event_batch = batch;
        }

        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .with_context(|| format!("invalid {key}: {raw:?}"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() -> Result<()> {
        assert_eq!(Config::from_lookup(lookup_from(&[]))?, Config::default());
        Ok(())
    }

    #[test]
    fn variables_override_defaults() -> Result<()> {
        let config = Config::from_lookup(lookup_from(&[
            (ENV_LISTEN_ADDR, "0.0.0.0:8080"),
            (ENV_AUTH_POLICY, "both"),
            (ENV_LOG, "dutch_escrow=debug"),
            (ENV_EVENT_BATCH, "4"),
        ]))?;

        assert_eq!(config.listen_addr, "0.0.0.0:8080".parse()?);
        assert_eq!(config.auth_policy, AuthPolicy::Both);
        assert_eq!(config.log, "dutch_escrow=debug");
        assert_eq!(config.event_batch, 4);
        Ok(())
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(Config::from_lookup(lookup_from(&[(ENV_LISTEN_ADDR, "nowhere")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[(ENV_AUTH_POLICY, "root")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[(ENV_EVENT_BATCH, "0")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[(ENV_AUTH_POLICY, "principal")])).is_err());
    }
}
