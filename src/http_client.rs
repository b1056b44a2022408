use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::{RETRY_AFTER, USER_AGENT};

use crate::backoff::{ApiRequest, HttpGet, HttpResponse};

const REQUEST_TIMEOUT_SECS: u64 = 60;
const CLIENT_USER_AGENT: &str = concat!("football_etl/", env!("CARGO_PKG_VERSION"));

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

impl HttpGet for Client {
    fn fetch(&self, req: &ApiRequest) -> Result<HttpResponse> {
        let mut builder = self
            .get(&req.url)
            .query(&req.query)
            .header(USER_AGENT, CLIENT_USER_AGENT);
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let resp = builder
            .send()
            .with_context(|| format!("request failed: {}", req.url))?;
        let status = resp.status().as_u16();
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = resp.text().context("failed reading body")?;

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}
