//! Instance configuration.
//!
//! Each named instance reads `SERVICENOW_<NAME>_INSTANCE_URL`, `_USERNAME`,
//! `_PASSWORD` and `_API_TOKEN`. The un-prefixed variables configure whichever
//! instance `SERVICENOW_DEFAULT_INSTANCE` names (default `dev`).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::store::Auth;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Named ServiceNow environment a tool call can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstanceName {
    /// Development instance.
    Dev,
    /// Test instance.
    Test,
    /// Production instance.
    Prod,
}

impl InstanceName {
    /// Every instance name, in routing order.
    pub const ALL: [InstanceName; 3] = [Self::Dev, Self::Test, Self::Prod];

    /// Lowercase name as used in tool payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Prod => "prod",
        }
    }

    fn env_prefix(self) -> String {
        format!("SERVICENOW_{}_", self.as_str().to_ascii_uppercase())
    }
}

impl fmt::Display for InstanceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "test" => Ok(Self::Test),
            "prod" => Ok(Self::Prod),
            other => Err(ConfigError::UnknownInstance(other.to_string())),
        }
    }
}

/// Configuration problems detected at startup.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// `SERVICENOW_DEFAULT_INSTANCE` or a payload named an unknown instance.
    #[error("unknown instance '{0}' (expected dev, test or prod)")]
    UnknownInstance(String),

    /// An instance URL is set without a token or a username/password pair.
    #[error("{0} is set but no credentials were given (username/password or API token)")]
    MissingCredentials(String),

    /// The default instance has no URL configured.
    #[error("default instance '{0}' has no URL configured")]
    DefaultNotConfigured(InstanceName),

    /// A variable could not be parsed.
    #[error("invalid value for {name}: {reason}")]
    InvalidValue {
        /// Variable or flag name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Connection settings for one instance.
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    /// Base URL without trailing slash.
    pub url: String,
    /// Credentials sent with every request.
    pub auth: Auth,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Configured instances.
    pub instances: BTreeMap<InstanceName, InstanceConfig>,
    /// Instance used when a call names none.
    pub default_instance: InstanceName,
    /// HTTP timeout per request.
    pub timeout: Duration,
    /// Reject create, update and delete.
    pub read_only: bool,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let default_instance = match get("SERVICENOW_DEFAULT_INSTANCE") {
            Some(name) => name.parse()?,
            None => InstanceName::Dev,
        };

        let timeout_secs = match get("SERVICENOW_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "SERVICENOW_TIMEOUT_SECS".to_string(),
                reason: format!("'{}' is not a whole number of seconds", raw),
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let mut instances = BTreeMap::new();
        for name in InstanceName::ALL {
            let prefix = name.env_prefix();
            if let Some(instance) = read_instance(&get, &prefix)? {
                instances.insert(name, instance);
            }
        }

        if let Some(instance) = read_instance(&get, "SERVICENOW_")? {
            instances.insert(default_instance, instance);
        }

        let config = Self {
            instances,
            default_instance,
            timeout: Duration::from_secs(timeout_secs),
            read_only: false,
        };
        config.validate()?;
        Ok(config)
    }

    /// The default instance must resolve to a configured endpoint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.instances.contains_key(&self.default_instance) {
            return Err(ConfigError::DefaultNotConfigured(self.default_instance));
        }
        Ok(())
    }
}

fn read_instance<G>(get: &G, prefix: &str) -> Result<Option<InstanceConfig>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let url_var = format!("{}INSTANCE_URL", prefix);
    let Some(url) = get(&url_var) else {
        return Ok(None);
    };

    let auth = match (
        get(&format!("{}API_TOKEN", prefix)),
        get(&format!("{}USERNAME", prefix)),
        get(&format!("{}PASSWORD", prefix)),
    ) {
        (Some(token), _, _) => Auth::Bearer(token),
        (None, Some(username), Some(password)) => Auth::Basic { username, password },
        _ => return Err(ConfigError::MissingCredentials(url_var)),
    };

    Ok(Some(InstanceConfig {
        url: url.trim().trim_end_matches('/').to_string(),
        auth,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn unprefixed_variables_configure_the_default_instance() {
        let config = config(&[
            ("SERVICENOW_INSTANCE_URL", "https://dev1234.service-now.com/"),
            ("SERVICENOW_USERNAME", "admin"),
            ("SERVICENOW_PASSWORD", "pw"),
        ])
        .unwrap();

        assert_eq!(config.default_instance, InstanceName::Dev);
        assert_eq!(config.timeout, Duration::from_secs(30));
        let dev = &config.instances[&InstanceName::Dev];
        assert_eq!(dev.url, "https://dev1234.service-now.com");
        assert!(matches!(dev.auth, Auth::Basic { .. }));
    }

    #[test]
    fn named_instances_and_default_selection() {
        let config = config(&[
            ("SERVICENOW_DEFAULT_INSTANCE", "prod"),
            ("SERVICENOW_PROD_INSTANCE_URL", "https://prod.example.com"),
            ("SERVICENOW_PROD_API_TOKEN", "tok"),
            ("SERVICENOW_TEST_INSTANCE_URL", "https://test.example.com"),
            ("SERVICENOW_TEST_USERNAME", "svc"),
            ("SERVICENOW_TEST_PASSWORD", "pw"),
            ("SERVICENOW_TIMEOUT_SECS", "5"),
        ])
        .unwrap();

        assert_eq!(config.default_instance, InstanceName::Prod);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.instances.len(), 2);
        assert!(matches!(
            config.instances[&InstanceName::Prod].auth,
            Auth::Bearer(_)
        ));
        assert!(!config.instances.contains_key(&InstanceName::Dev));
    }

    #[test]
    fn url_without_credentials_is_rejected() {
        let err = config(&[("SERVICENOW_TEST_INSTANCE_URL", "https://test.example.com")])
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingCredentials("SERVICENOW_TEST_INSTANCE_URL".to_string())
        );
    }

    #[test]
    fn default_instance_must_be_configured() {
        let err = config(&[
            ("SERVICENOW_TEST_INSTANCE_URL", "https://test.example.com"),
            ("SERVICENOW_TEST_API_TOKEN", "tok"),
        ])
        .unwrap_err();
        assert_eq!(err, ConfigError::DefaultNotConfigured(InstanceName::Dev));
    }

    #[test]
    fn bad_values_are_reported() {
        assert!(matches!(
            config(&[("SERVICENOW_DEFAULT_INSTANCE", "staging")]),
            Err(ConfigError::UnknownInstance(_))
        ));
        assert!(matches!(
            config(&[("SERVICENOW_TIMEOUT_SECS", "soon")]),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn instance_names_parse_case_insensitively() {
        assert_eq!("PROD".parse::<InstanceName>().unwrap(), InstanceName::Prod);
        assert_eq!(InstanceName::Test.to_string(), "test");
    }
}
