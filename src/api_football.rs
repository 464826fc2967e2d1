use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ApiFootballConfig;
use crate::http_client::{http_client, send_for_body};
use crate::model::Market;

const API_KEY_HEADER: &str = "x-apisports-key";
const MAX_PAGES_PER_SEASON: u32 = 40;

const BET_FT_OVER_UNDER: &str = "Goals Over/Under";
const BET_HT_OVER_UNDER: &str = "Goals Over/Under First Half";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub fixture: FixtureInfo,
    #[serde(default)]
    pub league: LeagueRef,
    #[serde(default)]
    pub teams: FixtureTeams,
    #[serde(default)]
    pub goals: GoalPair,
    #[serde(default)]
    pub score: ScoreBreakdown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureInfo {
    pub id: u64,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub status: FixtureStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureStatus {
    #[serde(default)]
    pub short: Option<String>,
    #[serde(default)]
    pub elapsed: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeagueRef {
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub season: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureTeams {
    #[serde(default)]
    pub home: TeamRef,
    #[serde(default)]
    pub away: TeamRef,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamRef {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalPair {
    #[serde(default)]
    pub home: Option<u32>,
    #[serde(default)]
    pub away: Option<u32>,
}

impl GoalPair {
    pub fn total(&self) -> Option<u32> {
        match (self.home, self.away) {
            (Some(h), Some(a)) => h.checked_add(a),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    #[serde(default)]
    pub halftime: GoalPair,
}

impl Fixture {
    pub fn status_short(&self) -> Option<&str> {
        self.fixture.status.short.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.status_short() == Some("FT")
    }

    pub fn elapsed(&self) -> u16 {
        self.fixture.status.elapsed.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FixturesPage {
    pub fixtures: Vec<Fixture>,
    pub total_pages: u32,
}

/// Decimal odds for the two tracked markets, as quoted by a single bookmaker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MarketOdds {
    pub over05_ht: Option<f64>,
    pub over15_ft: Option<f64>,
}

impl MarketOdds {
    pub fn get(&self, market: Market) -> Option<f64> {
        match market {
            Market::Over05Ht => self.over05_ht,
            Market::Over15Ft => self.over15_ft,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.over05_ht.is_none() && self.over15_ft.is_none()
    }
}

pub fn find_team_id(cfg: &ApiFootballConfig, team_name: &str) -> Result<Option<u32>> {
    let body = api_get(cfg, "/teams", &[("search", team_name.to_string())], "team search")?;
    parse_team_search(&body, team_name)
}

pub fn fetch_team_fixtures(cfg: &ApiFootballConfig, team_id: u32) -> Result<Vec<Fixture>> {
    let mut out = Vec::new();
    for season in &cfg.historic_seasons {
        let mut page = 1u32;
        loop {
            let body = api_get(
                cfg,
                "/fixtures",
                &[
                    ("team", team_id.to_string()),
                    ("league", cfg.league_id.to_string()),
                    ("season", season.to_string()),
                    ("page", page.to_string()),
                ],
                "fixtures",
            )
            .with_context(|| format!("team {team_id} season {season} page {page}"))?;
            let parsed = parse_fixtures_page(&body)?;
            debug!(
                team_id,
                season,
                page,
                count = parsed.fixtures.len(),
                "fetched fixtures page"
            );
            out.extend(parsed.fixtures);

            match next_page(page, parsed.total_pages) {
                PageStep::Next(next) => page = next,
                PageStep::Done => break,
                PageStep::Capped => {
                    warn!(
                        team_id,
                        season,
                        total_pages = parsed.total_pages,
                        "page cap reached, season history truncated"
                    );
                    break;
                }
            }
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageStep {
    Next(u32),
    Done,
    Capped,
}

fn next_page(page: u32, total_pages: u32) -> PageStep {
    if page >= total_pages.max(1) {
        PageStep::Done
    } else if page >= MAX_PAGES_PER_SEASON {
        PageStep::Capped
    } else {
        PageStep::Next(page + 1)
    }
}

/// Odds of the most recent head-to-head meeting in `season`.
pub fn fetch_h2h_odds(
    cfg: &ApiFootballConfig,
    home_id: u32,
    away_id: u32,
    season: u16,
) -> Result<MarketOdds> {
    let body = api_get(
        cfg,
        "/fixtures/headtohead",
        &[
            ("h2h", format!("{home_id}-{away_id}")),
            ("league", cfg.league_id.to_string()),
            ("season", season.to_string()),
        ],
        "head-to-head",
    )?;
    let page = parse_fixtures_page(&body)?;
    let Some(last) = page.fixtures.last() else {
        debug!(home_id, away_id, season, "no head-to-head fixture");
        return Ok(MarketOdds::default());
    };
    fetch_fixture_odds(cfg, last.fixture.id)
}

pub fn fetch_fixture_odds(cfg: &ApiFootballConfig, fixture_id: u64) -> Result<MarketOdds> {
    let body = api_get(
        cfg,
        "/odds",
        &[
            ("fixture", fixture_id.to_string()),
            ("bookmaker", cfg.bookmaker_id.to_string()),
        ],
        "odds",
    )?;
    Ok(extract_market_odds(&body))
}

pub fn fetch_live_fixtures(cfg: &ApiFootballConfig) -> Result<Vec<Fixture>> {
    let body = api_get(cfg, "/fixtures", &[("live", "all".to_string())], "live fixtures")?;
    let page = parse_fixtures_page(&body)?;
    Ok(page
        .fixtures
        .into_iter()
        .filter(|fx| fx.league.id == Some(cfg.league_id))
        .collect())
}

fn api_get(
    cfg: &ApiFootballConfig,
    path: &str,
    query: &[(&str, String)],
    what: &str,
) -> Result<String> {
    let Some(api_key) = cfg.api_key.as_ref() else {
        return Err(anyhow::anyhow!("API_FOOTBALL_KEY missing"));
    };
    let client = http_client()?;
    let url = format!("{}{path}", cfg.base_url);
    let req = client
        .get(&url)
        .header(API_KEY_HEADER, api_key.as_str())
        .query(query);
    send_for_body(req, what)
}

pub fn parse_team_search(raw: &str, team_name: &str) -> Result<Option<u32>> {
    let Some(v) = parse_envelope(raw).context("invalid team search json")? else {
        return Ok(None);
    };
    let wanted = team_name.trim().to_lowercase();
    let found = response_items(&v).find_map(|item| {
        let team = item.get("team")?;
        let name = team.get("name")?.as_str()?;
        if name.trim().to_lowercase() != wanted {
            return None;
        }
        team.get("id")?.as_u64().and_then(|id| u32::try_from(id).ok())
    });
    Ok(found)
}

pub fn parse_fixtures_page(raw: &str) -> Result<FixturesPage> {
    let Some(v) = parse_envelope(raw).context("invalid fixtures json")? else {
        return Ok(FixturesPage::default());
    };

    let mut fixtures = Vec::new();
    for item in response_items(&v) {
        match serde_json::from_value::<Fixture>(item.clone()) {
            Ok(fx) => fixtures.push(fx),
            Err(err) => warn!("skipping malformed fixture: {err}"),
        }
    }
    let total_pages = v
        .get("paging")
        .and_then(|p| p.get("total"))
        .and_then(|t| t.as_u64())
        .and_then(|t| u32::try_from(t).ok())
        .unwrap_or(1);

    Ok(FixturesPage {
        fixtures,
        total_pages,
    })
}

/// Pulls "Over 0.5" first-half and "Over 1.5" full-time prices from an odds payload.
/// Anything unexpected in the payload just leaves the market empty.
pub fn extract_market_odds(raw: &str) -> MarketOdds {
    let mut out = MarketOdds::default();
    let Ok(Some(v)) = parse_envelope(raw) else {
        return out;
    };
    let Some(first) = response_items(&v).next() else {
        return out;
    };
    let bookmakers = first
        .get("bookmakers")
        .and_then(|b| b.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    for bm in bookmakers {
        let bets = bm
            .get("bets")
            .and_then(|b| b.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();
        for bet in bets {
            let name = bet.get("name").and_then(|n| n.as_str()).unwrap_or_default();
            let (target, slot) = match name {
                BET_FT_OVER_UNDER => ("Over 1.5", &mut out.over15_ft),
                BET_HT_OVER_UNDER => ("Over 0.5", &mut out.over05_ht),
                _ => continue,
            };
            if let Some(odd) = find_outcome_price(bet, target) {
                *slot = Some(odd);
            }
        }
    }
    out
}

fn find_outcome_price(bet: &Value, target: &str) -> Option<f64> {
    bet.get("values")?.as_array()?.iter().find_map(|val| {
        if val.get("value")?.as_str()?.trim() != target {
            return None;
        }
        let odd = val.get("odd")?;
        odd.as_f64()
            .or_else(|| odd.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
    })
}

fn parse_envelope(raw: &str) -> Result<Option<Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    let v: Value = serde_json::from_str(trimmed)?;
    Ok(Some(v))
}

fn response_items(v: &Value) -> impl Iterator<Item = &Value> {
    v.get("response")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter())
        .into_iter()
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_pair_total_requires_both_sides() {
        let both = GoalPair {
            home: Some(1),
            away: Some(2),
        };
        assert_eq!(both.total(), Some(3));
        assert_eq!(GoalPair::default().total(), None);
        let absurd = GoalPair {
            home: Some(u32::MAX),
            away: Some(1),
        };
        assert_eq!(absurd.total(), None);
    }

    #[test]
    fn out_of_range_ids_and_page_counts_are_ignored() {
        let raw = r#"{"response":[{"team":{"id":4294967296,"name":"Benfica"}}]}"#;
        assert_eq!(parse_team_search(raw, "Benfica").unwrap(), None);
        let page = parse_fixtures_page(r#"{"response":[],"paging":{"total":4294967297}}"#).unwrap();
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn odds_accept_numeric_and_string_prices() {
        let raw = r#"{"response":[{"bookmakers":[{"bets":[
            {"name":"Goals Over/Under","values":[{"value":"Over 2.5","odd":"2.10"},{"value":"Over 1.5","odd":1.36}]},
            {"name":"Goals Over/Under First Half","values":[{"value":"Over 0.5","odd":"1.44"}]}
        ]}]}]}"#;
        let odds = extract_market_odds(raw);
        assert_eq!(odds.over15_ft, Some(1.36));
        assert_eq!(odds.over05_ht, Some(1.44));
    }

    #[test]
    fn odds_tolerate_garbage() {
        assert!(extract_market_odds("not json").is_empty());
        assert!(extract_market_odds(r#"{"response":[]}"#).is_empty());
        assert!(extract_market_odds(r#"{"response":[{"bookmakers":"x"}]}"#).is_empty());
    }

    #[test]
    fn paging_stops_at_last_page_and_flags_the_cap() {
        assert_eq!(next_page(1, 3), PageStep::Next(2));
        assert_eq!(next_page(3, 3), PageStep::Done);
        assert_eq!(next_page(1, 0), PageStep::Done);
        assert_eq!(next_page(MAX_PAGES_PER_SEASON, MAX_PAGES_PER_SEASON), PageStep::Done);
        assert_eq!(
            next_page(MAX_PAGES_PER_SEASON, MAX_PAGES_PER_SEASON + 5),
            PageStep::Capped
        );
    }

    #[test]
    fn paging_defaults_to_single_page() {
        let page = parse_fixtures_page(r#"{"response":[]}"#).unwrap();
        assert_eq!(page.total_pages, 1);
        assert!(page.fixtures.is_empty());
    }
}
