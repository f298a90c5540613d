use crate::error::ScrapeError;

pub const SOURCE_NAME: &str = "teamrankings_ats_trends";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeagueSource {
    pub league: String,
    pub url: String,
}

impl LeagueSource {
    pub fn new(league: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            league: league.into(),
            url: url.into(),
        }
    }
}

const LEAGUE_URLS: &[(&str, &str)] = &[
    ("nba", "https://www.teamrankings.com/nba/trends/ats_trends/"),
    ("nfl", "https://www.teamrankings.com/nfl/trends/ats_trends/"),
    ("ncb", "https://www.teamrankings.com/ncb/trends/ats_trends/"),
    ("ncf", "https://www.teamrankings.com/ncf/trends/ats_trends/"),
];

pub fn default_leagues() -> Vec<LeagueSource> {
    LEAGUE_URLS
        .iter()
        .map(|(league, url)| LeagueSource::new(*league, *url))
        .collect()
}

/// Narrows the registry to `filter` (case-insensitive). Registry order is kept
/// and an empty filter means every league.
pub fn select_leagues(filter: &[String]) -> Result<Vec<LeagueSource>, ScrapeError> {
    let all = default_leagues();
    let wanted = filter
        .iter()
        .map(|key| key.trim().to_ascii_lowercase())
        .filter(|key| !key.is_empty())
        .collect::<Vec<_>>();
    if wanted.is_empty() {
        return Ok(all);
    }
    if let Some(unknown) = wanted
        .iter()
        .find(|key| !all.iter().any(|l| &l.league == *key))
    {
        return Err(ScrapeError::Configuration(format!(
            "unknown league '{unknown}' (known: {})",
            LEAGUE_URLS
                .iter()
                .map(|(league, _)| *league)
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    Ok(all
        .into_iter()
        .filter(|l| wanted.contains(&l.league))
        .collect())
}
