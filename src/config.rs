use std::env;

use crate::error::ScrapeError;
use crate::leagues::{LeagueSource, select_leagues};
use crate::store::{ConflictPolicy, sqlite_location};

pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const POLICY_ENV: &str = "SCRAPE_POLICY";
pub const LEAGUES_ENV: &str = "SCRAPE_LEAGUES";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub policy: ConflictPolicy,
    pub leagues: Vec<LeagueSource>,
}

impl Config {
    /// Loads `.env.local` then `.env` (both optional), then resolves from the
    /// process environment and command line.
    pub fn from_env_and_args() -> Result<Self, ScrapeError> {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        let args = env::args().skip(1).collect::<Vec<_>>();
        Self::resolve(&args, |key| env::var(key).ok())
    }

    /// Command-line flags win over environment values.
    pub fn resolve(
        args: &[String],
        env_lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ScrapeError> {
        let lookup = |key: &str| env_lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = arg_values(args, "db")
            .pop()
            .or_else(|| lookup(DATABASE_URL_ENV))
            .ok_or_else(|| {
                ScrapeError::Configuration(format!(
                    "{DATABASE_URL_ENV} is not set. Put it in your .env or environment variables."
                ))
            })?;
        sqlite_location(&database_url)?;

        let policy = match arg_values(args, "policy").pop().or_else(|| lookup(POLICY_ENV)) {
            Some(raw) => raw.parse::<ConflictPolicy>()?,
            None => ConflictPolicy::default(),
        };

        let mut league_keys = arg_values(args, "league");
        if league_keys.is_empty()
            && let Some(raw) = lookup(LEAGUES_ENV)
        {
            league_keys.push(raw);
        }
        let league_keys = league_keys
            .iter()
            .flat_map(|raw| raw.split(','))
            .map(|key| key.to_string())
            .collect::<Vec<_>>();
        let leagues = select_leagues(&league_keys)?;

        Ok(Self {
            database_url,
            policy,
            leagues,
        })
    }
}

// Collects `--name value` and `--name=value` occurrences in order.
fn arg_values(args: &[String], name: &str) -> Vec<String> {
    let flag = format!("--{name}");
    let prefix = format!("--{name}=");
    let mut out = Vec::new();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        }
        if *arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                out.push(next.trim().to_string());
            }
        }
    }
    out
}
