use std::{fmt::Display, future::Future, time::Duration};

use reqwest::redirect;

/// Retrieves the HTTPS copy of a policy.
pub trait PolicyFetcher {
    fn fetch(&self, uri: &str) -> impl Future<Output = Result<String, Error>> + Send;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    Status(u16),
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, Error> {
        Ok(HttpFetcher {
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .timeout(timeout)
                .redirect(redirect::Policy::none())
                .https_only(true)
                .build()?,
        })
    }
}

impl PolicyFetcher for HttpFetcher {
    async fn fetch(&self, uri: &str) -> Result<String, Error> {
        let response = self.client.get(uri).send().await?;
        if !response.status().is_success() {
            return Err(Error::Status(response.status().as_u16()));
        }

        Ok(decode_body(&response.bytes().await?))
    }
}

/// Bodies that are not UTF-8 are decoded lossily and left for the policy
/// parser to reject.
pub fn decode_body(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Http(value)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Http(err) => {
                if err.is_timeout() {
                    f.write_str("Timeout fetching policy")
                } else if err.is_connect() {
                    write!(f, "Could not reach policy host: {}", err)
                } else {
                    write!(f, "Failed to fetch policy: {}", err)
                }
            }
            Error::Status(code) => write!(f, "Policy host returned HTTP status {}", code),
        }
    }
}
