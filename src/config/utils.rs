use std::time::Duration;

use crate::policy::verify::MatchMode;

use super::Config;

pub trait ParseValue: Sized {
    fn parse_value(key: &str, value: &str) -> super::Result<Self>;
}

impl Config {
    pub fn value<T: ParseValue>(&self, key: &str) -> super::Result<Option<T>> {
        if let Some(value) = self.keys.get(key) {
            T::parse_value(key, value).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn value_or_default<T: ParseValue + Default>(&self, key: &str) -> super::Result<T> {
        self.value(key).map(|value| value.unwrap_or_default())
    }

    pub fn set_value(&mut self, key: &str, value: impl Into<String>) {
        self.keys.insert(key.to_string(), value.into());
    }
}

impl ParseValue for String {
    fn parse_value(_key: &str, value: &str) -> super::Result<Self> {
        Ok(value.to_string())
    }
}

impl ParseValue for MatchMode {
    fn parse_value(key: &str, value: &str) -> super::Result<Self> {
        value
            .parse()
            .map_err(|err| format!("{} (key {:?})", err, key))
    }
}

impl ParseValue for tracing::Level {
    fn parse_value(key: &str, value: &str) -> super::Result<Self> {
        value
            .parse()
            .map_err(|_| format!("Invalid log level {:?} for key {:?}.", value, key))
    }
}

impl ParseValue for Duration {
    fn parse_value(key: &str, value: &str) -> super::Result<Self> {
        let value = value.trim();
        let split = value
            .find(|ch: char| !ch.is_ascii_digit())
            .unwrap_or(value.len());
        let (num, unit) = value.split_at(split);
        let num = num
            .parse::<u64>()
            .map_err(|_| format!("Invalid duration value {:?} for key {:?}.", value, key))?;

        Ok(match unit.trim() {
            "ms" => Duration::from_millis(num),
            "s" | "" => Duration::from_secs(num),
            "m" => Duration::from_secs(num * 60),
            "h" => Duration::from_secs(num * 3600),
            "d" => Duration::from_secs(num * 86400),
            _ => {
                return Err(format!(
                    "Invalid duration unit {:?} for key {:?}.",
                    unit, key
                ))
            }
        })
    }
}
