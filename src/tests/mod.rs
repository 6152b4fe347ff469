use std::{collections::HashMap, sync::Mutex};

use crate::{
    auth::fetch::{Error, PolicyFetcher},
    cache::PolicyCache,
    config::ValidatorConfig,
    validator::{Request, Validator},
};


/// Serves scripted responses and records every requested URI.
#[derive(Default)]
pub struct TestFetcher {
    responses: Mutex<HashMap<String, Result<String, Error>>>,
    requests: Mutex<Vec<String>>,
}

impl TestFetcher {
    pub fn with(self, uri: &str, response: Result<String, Error>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(uri.to_string(), response);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl PolicyFetcher for TestFetcher {
    async fn fetch(&self, uri: &str) -> Result<String, Error> {
        self.requests.lock().unwrap().push(uri.to_string());
        self.responses
            .lock()
            .unwrap()
            .remove(uri)
            .unwrap_or(Err(Error::Status(404)))
    }
}

impl Validator<TestFetcher> {
    pub fn test(fetcher: TestFetcher) -> Self {
        Validator::new(
            ValidatorConfig {
                cache: "sqlite::memory:".to_string(),
                ..Default::default()
            },
            fetcher,
        )
    }
}

impl Request {
    pub fn test(domain: &str, mx: &[&str], sts_record: &str, dnssec: bool) -> Self {
        Request {
            domain: domain.to_string(),
            mx: mx.iter().map(|mx| mx.to_string()).collect(),
            sts_record: sts_record.to_string(),
            dnssec,
        }
    }
}

pub async fn test_cache() -> PolicyCache {
    PolicyCache::open("sqlite::memory:").await.unwrap()
}
