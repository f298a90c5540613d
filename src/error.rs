use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("request to {url} failed")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to build http client")]
    Client(#[source] reqwest::Error),
    #[error("no page registered for {url}")]
    MissingPage { url: String },
    #[error("http {status} from {url}")]
    HttpStatus { url: String, status: u16 },
    #[error("no <table> found on the page")]
    NoTableFound,
    #[error("table has data rows but no usable header labels")]
    UnresolvableHeaders,
    #[error("sqlite operation failed")]
    Store(#[from] rusqlite::Error),
    #[error("payload serialization failed")]
    Serialize(#[from] serde_json::Error),
}

/// Coarse failure category, used when reporting which stage broke.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Configuration,
    Fetch,
    Parse,
    Store,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "ConfigurationError",
            Self::Fetch => "FetchError",
            Self::Parse => "ParseError",
            Self::Store => "StoreError",
        }
    }
}

impl ScrapeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Fetch { .. }
            | Self::Client(_)
            | Self::MissingPage { .. }
            | Self::HttpStatus { .. } => ErrorKind::Fetch,
            Self::NoTableFound | Self::UnresolvableHeaders => ErrorKind::Parse,
            Self::Store(_) | Self::Serialize(_) => ErrorKind::Store,
        }
    }
}

/// Finds the first `ScrapeError` in an `anyhow` chain and returns its category.
pub fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ScrapeError>())
        .map(ScrapeError::kind)
        .or_else(|| {
            err.chain()
                .any(|cause| cause.is::<rusqlite::Error>())
                .then_some(ErrorKind::Store)
        })
}
