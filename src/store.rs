use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, Transaction, params};

use crate::error::ScrapeError;
use crate::row::{NormalizedRow, TrendRow};

pub type RunId = i64;

/// How a snapshot write resolves against an existing row.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ConflictPolicy {
    /// One row per (league, team, day); a later write replaces it.
    #[default]
    OverwriteByDay,
    /// One row per (league, team, content hash); repeats are skipped.
    AppendIfChanged,
}

impl ConflictPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OverwriteByDay => "overwrite-by-day",
            Self::AppendIfChanged => "append-if-changed",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Self::OverwriteByDay => "ats_trends",
            Self::AppendIfChanged => "ats_trend_versions",
        }
    }

    pub fn flat_view(self) -> &'static str {
        match self {
            Self::OverwriteByDay => "flat_ats_trends_v",
            Self::AppendIfChanged => "flat_ats_trend_versions_v",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictPolicy {
    type Err = ScrapeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "overwrite-by-day" | "overwrite_by_day" | "daily" => Ok(Self::OverwriteByDay),
            "append-if-changed" | "append_if_changed" | "append" => Ok(Self::AppendIfChanged),
            other => Err(ScrapeError::Configuration(format!(
                "unknown conflict policy '{other}' (expected overwrite-by-day or append-if-changed)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSnapshot {
    pub id: i64,
    pub run_id: RunId,
    pub scraped_at: String,
    pub scrape_date: String,
    pub league: String,
    pub team: String,
    pub row_payload: TrendRow,
    pub row_hash: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatTrend {
    pub scrape_date: String,
    pub league: String,
    pub team: String,
    pub ats_record: Option<String>,
    pub cover_pct: Option<String>,
    pub mov: Option<f64>,
    pub ats_plus_minus: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRun {
    pub run_id: RunId,
    pub source: String,
    pub league: String,
    pub url: String,
    pub scraped_at: String,
}

/// Owns the sqlite connection. Writes go through a [`StoreSession`].
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens the store named by a `DATABASE_URL`-style location.
    pub fn open(database_url: &str) -> Result<Self> {
        let location = sqlite_location(database_url)?;
        if location == ":memory:" {
            return Self::open_in_memory();
        }
        let path = Path::new(location);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create db directory {}", parent.display()))?;
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("enable foreign keys")?;
        Ok(Self { conn })
    }

    /// Starts the single all-or-nothing scope for one invocation. Dropping the
    /// session without [`StoreSession::commit`] rolls everything back.
    pub fn session(&mut self) -> Result<StoreSession<'_>> {
        let tx = self.conn.transaction().context("begin ingest transaction")?;
        Ok(StoreSession { tx })
    }

    pub fn run_count(&self) -> Result<usize> {
        count(&self.conn, "SELECT COUNT(*) FROM scrape_runs", [])
    }

    pub fn snapshot_count(&self, policy: ConflictPolicy) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", policy.table());
        count(&self.conn, &sql, [])
    }

    pub fn load_runs(&self) -> Result<Vec<StoredRun>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT run_id, source, league, url, scraped_at FROM scrape_runs ORDER BY run_id",
            )
            .context("prepare load runs query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StoredRun {
                    run_id: row.get(0)?,
                    source: row.get(1)?,
                    league: row.get(2)?,
                    url: row.get(3)?,
                    scraped_at: row.get(4)?,
                })
            })
            .context("query load runs")?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode run row")?);
        }
        Ok(out)
    }

    /// Every stored snapshot for a league and team, oldest first.
    pub fn team_history(
        &self,
        policy: ConflictPolicy,
        league: &str,
        team: &str,
    ) -> Result<Vec<StoredSnapshot>> {
        let sql = format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM {} WHERE league = ?1 AND team = ?2
             ORDER BY scraped_at ASC, id ASC",
            policy.table()
        );
        self.query_snapshots(&sql, params![league, team])
    }

    /// Most recent snapshot of every team in a league.
    pub fn latest_snapshots(
        &self,
        policy: ConflictPolicy,
        league: &str,
    ) -> Result<Vec<StoredSnapshot>> {
        let table = policy.table();
        let sql = format!(
            r#"
            SELECT {SNAPSHOT_COLUMNS} FROM {table} AS s
            WHERE s.league = ?1
              AND s.id = (
                SELECT i.id FROM {table} AS i
                WHERE i.league = s.league AND i.team = s.team
                ORDER BY i.scraped_at DESC, i.id DESC
                LIMIT 1
              )
            ORDER BY s.team ASC
            "#
        );
        self.query_snapshots(&sql, params![league])
    }

    pub fn flat_trends(&self, policy: ConflictPolicy, league: &str) -> Result<Vec<FlatTrend>> {
        let sql = format!(
            "SELECT scrape_date, league, team, ats_record, cover_pct, mov, ats_plus_minus
             FROM {} WHERE league = ?1 ORDER BY scrape_date ASC, team ASC",
            policy.flat_view()
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("prepare flat trends query")?;
        let rows = stmt
            .query_map(params![league], |row| {
                Ok(FlatTrend {
                    scrape_date: row.get(0)?,
                    league: row.get(1)?,
                    team: row.get(2)?,
                    ats_record: row.get(3)?,
                    cover_pct: row.get(4)?,
                    mov: row.get(5)?,
                    ats_plus_minus: row.get(6)?,
                })
            })
            .context("query flat trends")?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode flat trend row")?);
        }
        Ok(out)
    }

    /// Removes a run; its snapshots go with it.
    pub fn delete_run(&self, run_id: RunId) -> Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM scrape_runs WHERE run_id = ?1", params![run_id])
            .context("delete run")?;
        Ok(n > 0)
    }

    fn query_snapshots(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<StoredSnapshot>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .context("prepare snapshot query")?;
        let rows = stmt
            .query_map(params, |row| {
                let payload: String = row.get(6)?;
                Ok((
                    StoredSnapshot {
                        id: row.get(0)?,
                        run_id: row.get(1)?,
                        scraped_at: row.get(2)?,
                        scrape_date: row.get(3)?,
                        league: row.get(4)?,
                        team: row.get(5)?,
                        row_payload: TrendRow::new(),
                        row_hash: row.get(7)?,
                    },
                    payload,
                ))
            })
            .context("query snapshots")?;

        let mut out = Vec::new();
        for row in rows {
            let (mut snapshot, payload) = row.context("decode snapshot row")?;
            snapshot.row_payload =
                TrendRow::from_json(&payload).context("decode snapshot payload")?;
            out.push(snapshot);
        }
        Ok(out)
    }
}

const SNAPSHOT_COLUMNS: &str =
    "id, run_id, scraped_at, scrape_date, league, team, row_payload, row_hash";

/// One transaction. Every write of an invocation happens through it.
pub struct StoreSession<'conn> {
    tx: Transaction<'conn>,
}

impl StoreSession<'_> {
    pub fn ensure_schema(&self) -> Result<()> {
        ensure_schema(&self.tx)
    }

    /// Appends an audit row for one league run and returns its id.
    pub fn record_run(
        &self,
        source_name: &str,
        league: &str,
        url: &str,
        scraped_at: DateTime<Utc>,
    ) -> Result<RunId> {
        self.tx
            .execute(
                "INSERT INTO scrape_runs (source, league, url, scraped_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![source_name, league, url, timestamp(scraped_at)],
            )
            .map_err(ScrapeError::from)
            .context("insert scrape run")?;
        Ok(self.tx.last_insert_rowid())
    }

    /// Writes one snapshot per row under `policy` and returns how many rows
    /// were inserted or replaced.
    pub fn upsert_snapshots(
        &self,
        policy: ConflictPolicy,
        run_id: RunId,
        league: &str,
        scraped_at: DateTime<Utc>,
        rows: &[NormalizedRow],
    ) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let sql = match policy {
            ConflictPolicy::OverwriteByDay => UPSERT_DAILY,
            ConflictPolicy::AppendIfChanged => INSERT_IF_CHANGED,
        };
        let mut stmt = self
            .tx
            .prepare_cached(sql)
            .context("prepare snapshot upsert")?;

        let scraped_at_text = timestamp(scraped_at);
        let scrape_date = scrape_date(scraped_at).to_string();
        let mut affected = 0usize;
        for row in rows {
            let payload = row.payload.to_json().map_err(ScrapeError::from)?;
            affected += stmt
                .execute(params![
                    run_id,
                    scraped_at_text,
                    scrape_date,
                    league,
                    row.team,
                    payload,
                    row.row_hash,
                ])
                .map_err(ScrapeError::from)
                .with_context(|| format!("upsert snapshot for team {}", row.team))?;
        }
        Ok(affected)
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit().context("commit ingest transaction")
    }

    pub fn rollback(self) -> Result<()> {
        self.tx.rollback().context("rollback ingest transaction")
    }
}

const UPSERT_DAILY: &str = r#"
    INSERT INTO ats_trends
        (run_id, scraped_at, scrape_date, league, team, row_payload, row_hash)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(league, team, scrape_date) DO UPDATE SET
        run_id = excluded.run_id,
        scraped_at = excluded.scraped_at,
        row_payload = excluded.row_payload,
        row_hash = excluded.row_hash
"#;

const INSERT_IF_CHANGED: &str = r#"
    INSERT INTO ats_trend_versions
        (run_id, scraped_at, scrape_date, league, team, row_payload, row_hash)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(league, team, row_hash) DO NOTHING
"#;

/// Creates tables, indexes and flat views when missing.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS scrape_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,
            league TEXT NOT NULL,
            url TEXT NOT NULL,
            scraped_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS ats_trends (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id INTEGER NOT NULL REFERENCES scrape_runs(run_id) ON DELETE CASCADE,
            scraped_at TEXT NOT NULL,
            scrape_date TEXT NOT NULL,
            league TEXT NOT NULL,
            team TEXT NOT NULL,
            row_payload TEXT NOT NULL,
            row_hash TEXT NOT NULL,
            UNIQUE (league, team, scrape_date)
        );
        CREATE INDEX IF NOT EXISTS idx_ats_trends_league_team_time
            ON ats_trends (league, team, scraped_at DESC);

        CREATE TABLE IF NOT EXISTS ats_trend_versions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id INTEGER NOT NULL REFERENCES scrape_runs(run_id) ON DELETE CASCADE,
            scraped_at TEXT NOT NULL,
            scrape_date TEXT NOT NULL,
            league TEXT NOT NULL,
            team TEXT NOT NULL,
            row_payload TEXT NOT NULL,
            row_hash TEXT NOT NULL,
            UNIQUE (league, team, row_hash)
        );
        CREATE INDEX IF NOT EXISTS idx_ats_trend_versions_league_team_time
            ON ats_trend_versions (league, team, scraped_at DESC);
        "#,
    )
    .context("create sqlite schema")?;

    for policy in [ConflictPolicy::OverwriteByDay, ConflictPolicy::AppendIfChanged] {
        conn.execute_batch(&flat_view_sql(policy))
            .with_context(|| format!("create view {}", policy.flat_view()))?;
    }
    Ok(())
}

// Mirrors the payload columns most consumers read; numbers lose their '+'.
fn flat_view_sql(policy: ConflictPolicy) -> String {
    format!(
        r#"
        DROP VIEW IF EXISTS {view};
        CREATE VIEW {view} AS
        SELECT
            scrape_date,
            league,
            team,
            ats_record,
            cover_pct,
            {mov} AS mov,
            {ats_plus_minus} AS ats_plus_minus
        FROM (
            SELECT
                scrape_date,
                league,
                team,
                row_payload ->> '$."ATS Record"' AS ats_record,
                row_payload ->> '$."Cover %"' AS cover_pct,
                TRIM(row_payload ->> '$."MOV"') AS mov_text,
                TRIM(REPLACE(row_payload ->> '$."ATS +/-"', '+', '')) AS ats_text
            FROM {table}
        );
        "#,
        view = policy.flat_view(),
        table = policy.table(),
        mov = numeric_or_null("mov_text"),
        ats_plus_minus = numeric_or_null("ats_text"),
    )
}

// REAL only for plain decimals (optional leading sign); anything else is NULL
// rather than CAST's silent 0.
fn numeric_or_null(column: &str) -> String {
    format!(
        "CASE WHEN {column} GLOB '*[0-9]*' \
           AND {column} NOT GLOB '*[^0-9.+-]*' \
           AND {column} NOT GLOB '?*[+-]*' \
           AND {column} NOT GLOB '*.*.*' \
         THEN CAST({column} AS REAL) END"
    )
}

/// Accepts a bare path, `sqlite://path`, `sqlite:path` or `:memory:`. Any
/// other `scheme://` url (postgres and friends) is refused.
pub fn sqlite_location(database_url: &str) -> Result<&str, ScrapeError> {
    let trimmed = database_url.trim();
    if let Some(rest) = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
    {
        return Ok(rest);
    }
    if let Some((scheme, _)) = trimmed.split_once("://") {
        return Err(ScrapeError::Configuration(format!(
            "unsupported database url scheme '{scheme}' (expected a sqlite path or sqlite:// url)"
        )));
    }
    Ok(trimmed)
}

/// UTC calendar day a snapshot belongs to.
pub fn scrape_date(scraped_at: DateTime<Utc>) -> NaiveDate {
    scraped_at.date_naive()
}

pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn count(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<usize> {
    let n = conn
        .query_row(sql, params, |row| row.get::<_, i64>(0))
        .context("count rows")?;
    usize::try_from(n).context("negative row count")
}
