use std::fmt::Display;

use crate::{
    auth::{
        fetch::{self, PolicyFetcher},
        AuthResolver, Trust,
    },
    cache::{self, CacheEntry, PolicyCache},
    config::ValidatorConfig,
    policy::{
        now,
        verify::{MatchMode, MxMatcher},
        Policy,
    },
    trail::Trail,
};

pub struct Validator<F: PolicyFetcher> {
    pub config: ValidatorConfig,
    pub fetcher: F,
}

#[derive(Debug, Clone, Default)]
pub struct Request {
    pub domain: String,
    pub mx: Vec<String>,
    pub sts_record: String,
    pub dnssec: bool,
}

#[derive(Debug)]
pub enum Status {
    Pass,
    Fail,
    Error(Error),
}

#[derive(Debug)]
pub struct Verdict {
    pub status: Status,
    pub trail: Trail,
}

#[derive(Debug)]
pub enum Error {
    Store(cache::Error),
    Fetch(fetch::Error),
}

impl<F: PolicyFetcher> Validator<F> {
    pub fn new(config: ValidatorConfig, fetcher: F) -> Self {
        Validator { config, fetcher }
    }

    /// Runs one validation. The cache is opened for the duration of the run
    /// and closed on every exit path.
    pub async fn validate(&self, request: &Request) -> Verdict {
        let mut trail = Trail::new(&request.domain);

        let status = match PolicyCache::open(&self.config.cache).await {
            Ok(cache) => {
                let status = self.validate_with(&cache, request, &mut trail).await;
                cache.close().await;
                status
            }
            Err(err) => {
                trail.record("cache-error", format!("FAIL: {}", err));
                Status::Error(Error::Store(err))
            }
        };

        Verdict { status, trail }
    }

    pub async fn validate_with(
        &self,
        cache: &PolicyCache,
        request: &Request,
        trail: &mut Trail,
    ) -> Status {
        match self.run(cache, request, trail).await {
            Ok(true) => Status::Pass,
            Ok(false) => Status::Fail,
            Err(err) => {
                // Fetch errors are already on the trail
                if let Error::Store(err) = &err {
                    trail.record("cache-error", format!("FAIL: {}", err));
                }
                tracing::warn!(
                    parent: trail.span(),
                    context = "sts",
                    event = "error",
                    reason = %err
                );
                Status::Error(err)
            }
        }
    }

    async fn run(
        &self,
        cache: &PolicyCache,
        request: &Request,
        trail: &mut Trail,
    ) -> Result<bool, Error> {
        let (policy, from_cache) = match cache.lookup(&request.domain).await? {
            Some(cached) if !cached.is_expired(now()) => {
                trail.record("cache-hit", "Cached");
                (cached.policy, true)
            }
            cached => {
                if cached.is_some() {
                    trail.record("cache-expired", "cache expired");
                } else {
                    trail.record("cache-miss", "no cache");
                }

                let dns = match Policy::parse(&request.domain, &request.sts_record) {
                    Ok(dns) => dns,
                    Err(err) => {
                        trail.record("no-policy", format!("No STS Policy ({})", err));
                        return Ok(true);
                    }
                };
                trail.record("dns-policy", "policy in DNS");

                match AuthResolver::new(&self.fetcher)
                    .establish_trust(dns, request.dnssec, trail)
                    .await
                {
                    Trust::Trusted(policy) => (policy, false),
                    Trust::Untrusted(reason) => {
                        tracing::info!(
                            parent: trail.span(),
                            context = "sts",
                            event = "untrusted",
                            reason = reason
                        );
                        return Ok(false);
                    }
                    Trust::Indeterminate(err) => return Err(err.into()),
                }
            }
        };

        let matcher = match MxMatcher::new(&policy, self.config.mx_match) {
            Ok(matcher) => matcher,
            Err(err) => {
                trail.record("invalid-pattern", format!("FAIL: invalid MX pattern ({})", err));
                return Ok(false);
            }
        };
        if !matcher.matches(&request.mx, trail) {
            if self.config.mx_match == MatchMode::All {
                trail.record("mx-fail", "FAIL: not every MX matches policy");
            }
            return Ok(false);
        }
        trail.record("mx-pass", "MX matches policy");

        if !from_cache {
            cache
                .store(&CacheEntry::new(&policy, &request.sts_record))
                .await?;
            trail.record("cache-update", "Updated Cache");
        }

        Ok(true)
    }
}

impl Status {
    pub fn exit_code(&self) -> i32 {
        match self {
            Status::Pass => 0,
            Status::Fail => 1,
            Status::Error(_) => 2,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Status::Pass)
    }
}

impl From<cache::Error> for Error {
    fn from(value: cache::Error) -> Self {
        Error::Store(value)
    }
}

impl From<fetch::Error> for Error {
    fn from(value: fetch::Error) -> Self {
        Error::Fetch(value)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Store(err) => err.fmt(f),
            Error::Fetch(err) => err.fmt(f),
        }
    }
}
