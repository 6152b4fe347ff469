use std::str::FromStr;

use regex::Regex;

use crate::trail::Trail;

use super::Policy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// At least one actual MX matches at least one pattern.
    #[default]
    Any,
    /// Every actual MX matches at least one pattern.
    All,
}

#[derive(Debug)]
pub struct MxPattern {
    pattern: String,
    regex: Regex,
}

#[derive(Debug)]
pub struct MxMatcher {
    patterns: Vec<MxPattern>,
    mode: MatchMode,
}

impl MxPattern {
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        // A leading '_' stands for exactly one label
        let expr = if let Some(suffix) = pattern.strip_prefix('_') {
            format!("^[a-z0-9-]+{}\\.?$", regex::escape(suffix))
        } else {
            format!("^{}\\.?$", regex::escape(pattern))
        };
        Ok(MxPattern {
            pattern: pattern.to_string(),
            regex: Regex::new(&expr)?,
        })
    }

    pub fn matches(&self, host: &str) -> bool {
        self.regex.is_match(&host.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

impl MxMatcher {
    pub fn new(policy: &Policy, mode: MatchMode) -> Result<Self, regex::Error> {
        Ok(MxMatcher {
            patterns: policy
                .mx
                .iter()
                .map(|pattern| MxPattern::compile(pattern))
                .collect::<Result<Vec<_>, _>>()?,
            mode,
        })
    }

    pub fn matches(&self, hosts: &[String], trail: &mut Trail) -> bool {
        let mut matched_any = false;
        let mut matched_all = !hosts.is_empty();

        for host in hosts {
            let mut host_matched = false;
            for pattern in &self.patterns {
                if pattern.matches(host) {
                    trail.record(
                        "mx-match",
                        format!("MX {:?} matches {:?}", host, pattern.as_str()),
                    );
                    host_matched = true;
                } else {
                    trail.record(
                        "mx-mismatch",
                        format!("FAIL: {:?} does not match {:?}", host, pattern.as_str()),
                    );
                }
            }
            matched_any |= host_matched;
            matched_all &= host_matched;
        }

        match self.mode {
            MatchMode::Any => matched_any,
            MatchMode::All => matched_all,
        }
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "any" => Ok(MatchMode::Any),
            "all" => Ok(MatchMode::All),
            _ => Err(format!("Invalid MX match mode {:?}.", value)),
        }
    }
}
