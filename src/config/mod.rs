pub mod utils;

use std::{collections::BTreeMap, time::Duration};

use crate::{policy::verify::MatchMode, USER_AGENT};

pub const DEFAULT_CACHE_PATH: &str = "/var/tmp/smtp-sts-cache.db";

/// Configuration flattened to dotted keys, e.g. `cache.path`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Config {
    pub keys: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub cache: String,
    pub http_timeout: Duration,
    pub user_agent: String,
    pub mx_match: MatchMode,
}

pub type Result<T> = std::result::Result<T, String>;

impl Config {
    pub fn parse(toml: &str) -> Result<Self> {
        let table = toml
            .parse::<toml::Table>()
            .map_err(|err| format!("Failed to parse configuration: {}", err))?;
        let mut config = Config::default();
        config.insert_table("", &table);
        Ok(config)
    }

    fn insert_table(&mut self, prefix: &str, table: &toml::Table) {
        for (key, value) in table {
            let key = if prefix.is_empty() {
                key.to_string()
            } else {
                format!("{}.{}", prefix, key)
            };
            self.insert_value(key, value);
        }
    }

    fn insert_value(&mut self, key: String, value: &toml::Value) {
        match value {
            toml::Value::Table(table) => self.insert_table(&key, table),
            toml::Value::Array(values) => {
                for (pos, value) in values.iter().enumerate() {
                    self.insert_value(format!("{}.{}", key, pos), value);
                }
            }
            toml::Value::String(value) => {
                self.keys.insert(key, value.to_string());
            }
            other => {
                self.keys.insert(key, other.to_string());
            }
        }
    }

    pub fn build_validator_config(&self) -> Result<ValidatorConfig> {
        Ok(ValidatorConfig {
            cache: self
                .value::<String>("cache.path")?
                .unwrap_or_else(|| DEFAULT_CACHE_PATH.to_string()),
            http_timeout: self
                .value("http.timeout")?
                .unwrap_or_else(|| Duration::from_secs(30)),
            user_agent: self
                .value::<String>("http.user-agent")?
                .unwrap_or_else(|| USER_AGENT.to_string()),
            mx_match: self.value_or_default("policy.mx-match")?,
        })
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig {
            cache: DEFAULT_CACHE_PATH.to_string(),
            http_timeout: Duration::from_secs(30),
            user_agent: USER_AGENT.to_string(),
            mx_match: MatchMode::Any,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{config::Config, policy::verify::MatchMode, USER_AGENT};

    #[test]
    fn parse_validator_config() {
        let config = Config::parse(
            r#"
[cache]
path = "sqlite::memory:"

[http]
timeout = "1500ms"

[policy]
mx-match = "all"

[global]
log-level = "debug"
"#,
        )
        .unwrap()
        .build_validator_config()
        .unwrap();

        assert_eq!(config.cache, "sqlite::memory:");
        assert_eq!(config.http_timeout, Duration::from_millis(1500));
        assert_eq!(config.user_agent, USER_AGENT);
        assert_eq!(config.mx_match, MatchMode::All);

        let config = Config::default().build_validator_config().unwrap();
        assert_eq!(config.cache, "/var/tmp/smtp-sts-cache.db");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.mx_match, MatchMode::Any);

        for toml in [
            "[http]\ntimeout = \"soon\"",
            "[policy]\nmx-match = \"most\"",
            "[cache\npath = 1",
        ] {
            assert!(
                Config::parse(toml).and_then(|c| c.build_validator_config()).is_err(),
                "{toml}"
            );
        }
    }
}
