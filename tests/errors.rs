use anyhow::Context;
use ats_trends::error::{ErrorKind, ScrapeError, error_kind};
use ats_trends::fetch::{HttpPageSource, PageSource, StaticPageSource};

const NBA_URL: &str = "https://www.teamrankings.com/nba/trends/ats_trends/";

#[test]
fn http_status_is_a_fetch_error() {
    let err = ScrapeError::HttpStatus {
        url: NBA_URL.to_string(),
        status: 503,
    };
    assert_eq!(err.kind(), ErrorKind::Fetch);
    assert_eq!(err.kind().as_str(), "FetchError");
    assert!(err.to_string().contains("503"));
}

#[test]
fn unreachable_request_maps_to_fetch() {
    // An unparseable url fails inside reqwest before any socket is opened.
    let err = HttpPageSource
        .fetch_page("not a url")
        .expect_err("invalid url cannot be fetched");
    assert!(matches!(err, ScrapeError::Fetch { ref url, .. } if url == "not a url"));
    assert_eq!(err.kind(), ErrorKind::Fetch);
}

#[test]
fn missing_canned_page_maps_to_fetch() {
    let err = StaticPageSource::new()
        .fetch_page(NBA_URL)
        .expect_err("nothing registered");
    assert_eq!(err.kind(), ErrorKind::Fetch);
}

#[test]
fn kinds_per_stage() {
    assert_eq!(
        ScrapeError::Configuration("x".into()).kind().as_str(),
        "ConfigurationError"
    );
    assert_eq!(ScrapeError::NoTableFound.kind(), ErrorKind::Parse);
    assert_eq!(ScrapeError::UnresolvableHeaders.kind(), ErrorKind::Parse);
    assert_eq!(
        ScrapeError::from(rusqlite::Error::InvalidQuery).kind(),
        ErrorKind::Store
    );
}

#[test]
fn kind_survives_context_layers() {
    let err = Err::<(), _>(ScrapeError::HttpStatus {
        url: NBA_URL.to_string(),
        status: 404,
    })
    .context("league nba: fetch")
    .context("ingest")
    .expect_err("wrapped");
    assert_eq!(error_kind(&err), Some(ErrorKind::Fetch));

    let bare_sqlite = Err::<(), _>(rusqlite::Error::InvalidQuery)
        .context("count rows")
        .expect_err("wrapped");
    assert_eq!(error_kind(&bare_sqlite), Some(ErrorKind::Store));

    assert_eq!(error_kind(&anyhow::anyhow!("something else")), None);
}
