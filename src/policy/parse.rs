use std::collections::HashMap;

use super::{now, AuthMode, CertConstraint, Error, Policy, Version, VERSION_TOKEN};

impl Policy {
    pub fn parse(domain: &str, record: &str) -> Result<Policy, Error> {
        Policy::parse_at(domain, record, now())
    }

    pub fn parse_at(domain: &str, record: &str, observed_at: u64) -> Result<Policy, Error> {
        let mut tags = HashMap::new();

        for pair in record.split(';').map(|pair| pair.trim()) {
            if pair.is_empty() {
                continue;
            }
            if let Some((key, value)) = pair.split_once('=') {
                // Repeated keys: last one wins
                tags.insert(key.trim(), value.trim());
            } else {
                return Err(Error::InvalidPair(pair.to_string()));
            }
        }

        let version = match required(&tags, "v")? {
            VERSION_TOKEN => Version::Sts1,
            other => return Err(Error::UnsupportedVersion(other.to_string())),
        };

        let max_age = required(&tags, "e")?;
        let max_age = max_age
            .parse::<u64>()
            .map_err(|_| Error::InvalidMaxAge(max_age.to_string()))?;

        let mx = required(&tags, "mx")?
            .split(',')
            .filter_map(|pattern| {
                let pattern = pattern.trim();
                if !pattern.is_empty() {
                    Some(pattern.to_lowercase())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>();
        if mx.is_empty() {
            return Err(Error::NoMxPatterns);
        }

        let tls_only = tags.get("to").map_or(false, |value| *value == "true");

        let auth = parse_auth(domain, required(&tags, "a")?)?;

        let constraint = match required(&tags, "c")? {
            "webpki" => CertConstraint::WebPki,
            "tlsa" => CertConstraint::Tlsa,
            other => return Err(Error::InvalidConstraint(other.to_string())),
        };

        Ok(Policy {
            domain: domain.to_string(),
            version,
            auth,
            constraint,
            max_age,
            tls_only,
            report_uri: tags.get("rua").map(|value| value.to_string()),
            mx,
            observed_at,
        })
    }
}

fn required<'x>(tags: &HashMap<&str, &'x str>, key: &'static str) -> Result<&'x str, Error> {
    tags.get(key).copied().ok_or(Error::MissingKey(key))
}

fn parse_auth(domain: &str, value: &str) -> Result<AuthMode, Error> {
    if value.starts_with("dnssec") {
        Ok(AuthMode::Dnssec)
    } else if let Some(location) = value.strip_prefix("webpki") {
        Ok(AuthMode::WebPki(
            match location.split_once(':').map(|(_, path)| path.trim()) {
                Some(path) => format!("https://{}/{}", domain, path.trim_start_matches('/')),
                None => Policy::default_location(domain),
            },
        ))
    } else {
        Err(Error::InvalidAuth(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::policy::{AuthMode, CertConstraint, Error, Policy, Version};

    #[test]
    fn parse_policy() {
        for (record, expected_policy) in [
            (
                "v=STS1; a=dnssec; c=webpki; e=86400; mx=mail.example.com; to=true",
                Policy {
                    domain: "example.com".to_string(),
                    version: Version::Sts1,
                    auth: AuthMode::Dnssec,
                    constraint: CertConstraint::WebPki,
                    max_age: 86400,
                    tls_only: true,
                    report_uri: None,
                    mx: vec!["mail.example.com".to_string()],
                    observed_at: 1000,
                },
            ),
            (
                "v=STS1;a=webpki;c=tlsa;e=3600;mx=_.example.com, Backup.Example.net;rua=mailto:tls@example.com;",
                Policy {
                    domain: "example.com".to_string(),
                    version: Version::Sts1,
                    auth: AuthMode::WebPki(
                        "https://example.com/.well-known/smtp-sts/current".to_string(),
                    ),
                    constraint: CertConstraint::Tlsa,
                    max_age: 3600,
                    tls_only: false,
                    report_uri: Some("mailto:tls@example.com".to_string()),
                    mx: vec![
                        "_.example.com".to_string(),
                        "backup.example.net".to_string(),
                    ],
                    observed_at: 1000,
                },
            ),
            (
                "v=STS1; a=webpki:sts/policy.txt; c=webpki; e=60; mx=mx.example.com; to=yes; e=120",
                Policy {
                    domain: "example.com".to_string(),
                    version: Version::Sts1,
                    auth: AuthMode::WebPki("https://example.com/sts/policy.txt".to_string()),
                    constraint: CertConstraint::WebPki,
                    max_age: 120,
                    tls_only: false,
                    report_uri: None,
                    mx: vec!["mx.example.com".to_string()],
                    observed_at: 1000,
                },
            ),
        ] {
            assert_eq!(
                Policy::parse_at("example.com", record, 1000).unwrap(),
                expected_policy,
                "{record}"
            );
        }
    }

    #[test]
    fn parse_invalid_policy() {
        for (record, expected_err) in [
            ("", Error::MissingKey("v")),
            (
                "a=dnssec; c=webpki; e=86400; mx=mail.example.com",
                Error::MissingKey("v"),
            ),
            (
                "v=STS2; a=dnssec; c=webpki; e=86400; mx=mail.example.com",
                Error::UnsupportedVersion("STS2".to_string()),
            ),
            (
                "v=STS1; a=dnssec; c=webpki; e=1d; mx=mail.example.com",
                Error::InvalidMaxAge("1d".to_string()),
            ),
            (
                "v=STS1; a=dnssec; c=webpki; e=-5; mx=mail.example.com",
                Error::InvalidMaxAge("-5".to_string()),
            ),
            (
                "v=STS1; a=dnssec; c=dane; e=86400; mx=mail.example.com",
                Error::InvalidConstraint("dane".to_string()),
            ),
            (
                "v=STS1; a=x509; c=webpki; e=86400; mx=mail.example.com",
                Error::InvalidAuth("x509".to_string()),
            ),
            (
                "v=STS1; a=dnssec; c=webpki; e=86400; mx=",
                Error::NoMxPatterns,
            ),
            (
                "v=STS1; a=dnssec; c=webpki; e=86400; mx= , ",
                Error::NoMxPatterns,
            ),
            (
                "v=STS1; a=dnssec; c=webpki; e=86400",
                Error::MissingKey("mx"),
            ),
            (
                "v=STS1; a=dnssec; garbage; e=86400; mx=mail.example.com",
                Error::InvalidPair("garbage".to_string()),
            ),
        ] {
            assert_eq!(
                Policy::parse_at("example.com", record, 0).unwrap_err(),
                expected_err,
                "{record}"
            );
        }
    }

    #[test]
    fn serialize_policy() {
        for record in [
            "v=STS1; a=dnssec; c=webpki; e=86400; mx=mail.example.com; to=true",
            "v=STS1; a=webpki; c=tlsa; e=0; mx=_.example.com,mx.example.net; to=false; rua=mailto:a@example.com",
            "v=STS1; a=webpki:policy/sts.txt; c=webpki; e=604800; mx=mx.example.com; to=false",
        ] {
            let policy = Policy::parse_at("example.com", record, 42).unwrap();
            assert_eq!(policy.to_string(), record);
            assert_eq!(
                Policy::parse_at("example.com", &policy.to_string(), 42).unwrap(),
                policy
            );
        }
    }

    #[test]
    fn compare_content() {
        let dns = Policy::parse_at(
            "example.com",
            "v=STS1; a=webpki; c=webpki; e=86400; mx=mail.example.com; to=true",
            1,
        )
        .unwrap();
        let https = Policy::parse_at(
            "example.com",
            "to=true; mx=mail.example.com; e=86400; c=webpki; a=webpki; v=STS1",
            99,
        )
        .unwrap();
        assert!(dns.same_content(&https));
        assert_eq!(dns.expires_at(), 86401);

        let https = Policy::parse_at(
            "example.com",
            "v=STS1; a=webpki; c=webpki; e=86400; mx=rogue.example.org; to=true",
            1,
        )
        .unwrap();
        assert!(!dns.same_content(&https));
    }
}
