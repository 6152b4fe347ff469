use std::fmt::Display;

pub mod parse;
pub mod verify;

pub const VERSION_TOKEN: &str = "STS1";
pub const WELL_KNOWN_PATH: &str = ".well-known/smtp-sts/current";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Sts1,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    Dnssec,
    WebPki(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertConstraint {
    WebPki,
    Tlsa,
}

/// A validated STS policy record.
///
/// Instances only exist after every field of the record passed validation,
/// see [`Policy::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub domain: String,
    pub version: Version,
    pub auth: AuthMode,
    pub constraint: CertConstraint,
    pub max_age: u64,
    pub tls_only: bool,
    pub report_uri: Option<String>,
    pub mx: Vec<String>,
    pub observed_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    MissingKey(&'static str),
    InvalidPair(String),
    UnsupportedVersion(String),
    InvalidMaxAge(String),
    InvalidAuth(String),
    InvalidConstraint(String),
    NoMxPatterns,
}

impl Policy {
    pub fn expires_at(&self) -> u64 {
        self.observed_at.saturating_add(self.max_age)
    }

    /// Compares the published content of two policies, ignoring the domain
    /// and the observation time.
    pub fn same_content(&self, other: &Policy) -> bool {
        self.version == other.version
            && self.auth == other.auth
            && self.constraint == other.constraint
            && self.max_age == other.max_age
            && self.tls_only == other.tls_only
            && self.report_uri == other.report_uri
            && self.mx == other.mx
    }

    pub fn default_location(domain: &str) -> String {
        format!("https://{}/{}", domain, WELL_KNOWN_PATH)
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Version::Sts1 => f.write_str(VERSION_TOKEN),
        }
    }
}

impl Display for CertConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CertConstraint::WebPki => f.write_str("webpki"),
            CertConstraint::Tlsa => f.write_str("tlsa"),
        }
    }
}

impl Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v={}; ", self.version)?;
        match &self.auth {
            AuthMode::Dnssec => f.write_str("a=dnssec; ")?,
            AuthMode::WebPki(uri) if *uri == Policy::default_location(&self.domain) => {
                f.write_str("a=webpki; ")?
            }
            AuthMode::WebPki(uri) => {
                let prefix = format!("https://{}/", self.domain);
                write!(
                    f,
                    "a=webpki:{}; ",
                    uri.strip_prefix(&prefix).unwrap_or(uri.as_str())
                )?
            }
        }
        write!(
            f,
            "c={}; e={}; mx={}; to={}",
            self.constraint,
            self.max_age,
            self.mx.join(","),
            self.tls_only
        )?;
        if let Some(report_uri) = &self.report_uri {
            write!(f, "; rua={}", report_uri)?;
        }
        Ok(())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MissingKey(key) => write!(f, "Missing required key {:?}.", key),
            Error::InvalidPair(pair) => write!(f, "Invalid key/value pair {:?}.", pair),
            Error::UnsupportedVersion(version) => {
                write!(f, "Unsupported version {:?}.", version)
            }
            Error::InvalidMaxAge(value) => write!(f, "Invalid max age {:?}.", value),
            Error::InvalidAuth(value) => {
                write!(f, "Unsupported authentication mechanism {:?}.", value)
            }
            Error::InvalidConstraint(value) => {
                write!(f, "Unsupported certificate constraint {:?}.", value)
            }
            Error::NoMxPatterns => f.write_str("No 'mx' patterns found."),
        }
    }
}

pub fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
