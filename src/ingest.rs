use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::extract::extract_rows_from_html;
use crate::fetch::PageSource;
use crate::leagues::{LeagueSource, SOURCE_NAME};
use crate::row::normalize_rows;
use crate::store::{ConflictPolicy, RunId, Store, StoreSession};

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub policy: ConflictPolicy,
    pub leagues: Vec<LeagueSource>,
    pub source_name: String,
}

impl IngestOptions {
    pub fn new(policy: ConflictPolicy, leagues: Vec<LeagueSource>) -> Self {
        Self {
            policy,
            leagues,
            source_name: SOURCE_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeagueIngestSummary {
    pub league: String,
    pub url: String,
    pub run_id: RunId,
    pub rows_parsed: usize,
    pub rows_affected: usize,
}

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub scraped_at: DateTime<Utc>,
    pub policy: ConflictPolicy,
    pub per_league: Vec<LeagueIngestSummary>,
    pub total_rows_affected: usize,
}

/// Scrapes every league in `options` and stores the snapshots in one
/// transaction stamped with the current time.
pub fn ingest_leagues(
    store: &mut Store,
    source: &dyn PageSource,
    options: &IngestOptions,
) -> Result<IngestSummary> {
    ingest_leagues_at(store, source, options, Utc::now())
}

/// Same as [`ingest_leagues`] with a caller-chosen `scraped_at`. Any failure
/// rolls back every league, including the schema bootstrap.
pub fn ingest_leagues_at(
    store: &mut Store,
    source: &dyn PageSource,
    options: &IngestOptions,
    scraped_at: DateTime<Utc>,
) -> Result<IngestSummary> {
    if options.leagues.is_empty() {
        return Err(anyhow!("no leagues passed to ingest"));
    }

    let session = store.session()?;
    match ingest_in_session(&session, source, options, scraped_at) {
        Ok(summary) => {
            session.commit()?;
            Ok(summary)
        }
        Err(err) => {
            if let Err(rollback_err) = session.rollback() {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

fn ingest_in_session(
    session: &StoreSession<'_>,
    source: &dyn PageSource,
    options: &IngestOptions,
    scraped_at: DateTime<Utc>,
) -> Result<IngestSummary> {
    session.ensure_schema()?;

    let mut per_league = Vec::with_capacity(options.leagues.len());
    let mut total_rows_affected = 0usize;
    for league in &options.leagues {
        let summary = ingest_single_league(session, source, options, league, scraped_at)?;
        total_rows_affected += summary.rows_affected;
        per_league.push(summary);
    }

    Ok(IngestSummary {
        scraped_at,
        policy: options.policy,
        per_league,
        total_rows_affected,
    })
}

fn ingest_single_league(
    session: &StoreSession<'_>,
    source: &dyn PageSource,
    options: &IngestOptions,
    league: &LeagueSource,
    scraped_at: DateTime<Utc>,
) -> Result<LeagueIngestSummary> {
    let name = league.league.as_str();
    info!(league = name, url = %league.url, "fetching");

    let html = source
        .fetch_page(&league.url)
        .with_context(|| format!("league {name}: fetch"))?;
    let rows = extract_rows_from_html(&html).with_context(|| format!("league {name}: extract"))?;
    info!(league = name, rows = rows.len(), "rows parsed");

    let rows = normalize_rows(rows);
    let run_id = session
        .record_run(&options.source_name, name, &league.url, scraped_at)
        .with_context(|| format!("league {name}: record run"))?;
    let rows_affected = session
        .upsert_snapshots(options.policy, run_id, name, scraped_at, &rows)
        .with_context(|| format!("league {name}: upsert"))?;
    info!(
        league = name,
        run_id,
        rows = rows_affected,
        policy = %options.policy,
        "snapshots written"
    );

    Ok(LeagueIngestSummary {
        league: league.league.clone(),
        url: league.url.clone(),
        run_id,
        rows_parsed: rows.len(),
        rows_affected,
    })
}
