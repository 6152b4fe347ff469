use crate::{
    policy::{AuthMode, Policy},
    trail::Trail,
};

use self::fetch::PolicyFetcher;

pub mod fetch;

#[derive(Debug)]
pub enum Trust {
    Trusted(Policy),
    Untrusted(String),
    Indeterminate(fetch::Error),
}

pub struct AuthResolver<'x, F: PolicyFetcher> {
    fetcher: &'x F,
}

impl<'x, F: PolicyFetcher> AuthResolver<'x, F> {
    pub fn new(fetcher: &'x F) -> Self {
        AuthResolver { fetcher }
    }

    /// Decides whether a policy discovered in DNS may be trusted. The
    /// `dnssec` flag is the caller's claim that the answer carrying the
    /// record was DNSSEC validated.
    pub async fn establish_trust(&self, dns: Policy, dnssec: bool, trail: &mut Trail) -> Trust {
        match &dns.auth {
            AuthMode::WebPki(uri) => {
                let record = match self.fetcher.fetch(uri).await {
                    Ok(record) => record,
                    Err(err) => {
                        trail.record("webpki-error", format!("FAIL: {}", err));
                        return Trust::Indeterminate(err);
                    }
                };
                trail.record("webpki-fetched", "got webpki");

                match Policy::parse_at(&dns.domain, &record, dns.observed_at) {
                    Ok(https) if https.same_content(&dns) => {
                        trail.record("webpki-match", "DNS and WebPKI match");
                        Trust::Trusted(dns)
                    }
                    Ok(_) => {
                        trail.record("webpki-mismatch", "FAIL: DNS and WebPKI mismatch");
                        Trust::Untrusted("DNS and WebPKI policies differ".to_string())
                    }
                    Err(err) => {
                        trail.record(
                            "webpki-invalid",
                            format!("FAIL: invalid WebPKI policy ({})", err),
                        );
                        Trust::Untrusted(format!("Invalid WebPKI policy: {}", err))
                    }
                }
            }
            AuthMode::Dnssec if dnssec => {
                trail.record("dnssec-match", "DNS and DNSSEC match");
                Trust::Trusted(dns)
            }
            AuthMode::Dnssec => {
                trail.record("dnssec-missing", "FAIL: policy requires DNSSEC");
                Trust::Untrusted("Policy requires DNSSEC but the answer was not validated".to_string())
            }
        }
    }
}
