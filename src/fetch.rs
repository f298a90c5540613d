use std::collections::HashMap;
use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

use crate::error::ScrapeError;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const USER_AGENT_VALUE: &str = "Mozilla/5.0";

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client, ScrapeError> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(ScrapeError::Client)
    })
}

/// Where league pages come from.
pub trait PageSource {
    fn fetch_page(&self, url: &str) -> Result<String, ScrapeError>;
}

/// Live source: one GET per page, no retries.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpPageSource;

impl PageSource for HttpPageSource {
    fn fetch_page(&self, url: &str) -> Result<String, ScrapeError> {
        let client = http_client()?;
        let fetch_err = |source| ScrapeError::Fetch {
            url: url.to_string(),
            source,
        };
        let resp = client
            .get(url)
            .header(USER_AGENT, USER_AGENT_VALUE)
            .send()
            .map_err(fetch_err)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.text().map_err(fetch_err)
    }
}

/// Canned pages keyed by url, for offline runs and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticPageSource {
    pages: HashMap<String, String>,
}

impl StaticPageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }
}

impl PageSource for StaticPageSource {
    fn fetch_page(&self, url: &str) -> Result<String, ScrapeError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| ScrapeError::MissingPage {
                url: url.to_string(),
            })
    }
}
