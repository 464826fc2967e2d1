use anyhow::{Result, bail};
use serde::Serialize;
use tracing::{info, warn};

use crate::api_football::{self, Fixture, MarketOdds};
use crate::config::AppConfig;
use crate::model::{Market, MatchProbabilities, estimate_match_probabilities};
use crate::notifier::AlertSink;
use crate::predict::{AlertOutcome, evaluate_alerts};
use crate::stats::compute_over_stats;

const HALF_TIME_MINUTE: u16 = 45;
const FT_LATE_MINUTE: u16 = 80;

#[derive(Debug, Clone, Serialize)]
pub struct LiveScanItem {
    pub fixture_id: u64,
    pub home_team: String,
    pub away_team: String,
    pub elapsed: u16,
    pub score: (u32, u32),
    pub open_markets: Vec<Market>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<MatchProbabilities>,
    pub odds: MarketOdds,
    pub alerts: Vec<AlertOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Markets still worth pricing given the clock and the current score.
pub fn open_markets(elapsed: u16, home_goals: u32, away_goals: u32) -> Vec<Market> {
    let total = home_goals.saturating_add(away_goals);
    let mut out = Vec::new();
    // Over 0.5 HT: settled by any goal, dead at the break.
    if elapsed < HALF_TIME_MINUTE && total == 0 {
        out.push(Market::Over05Ht);
    }
    // Over 1.5 FT: settled at two goals, too late to price in the last ten minutes.
    if elapsed < FT_LATE_MINUTE && total < 2 {
        out.push(Market::Over15Ft);
    }
    out
}

pub fn scan_live(cfg: &AppConfig, sink: &dyn AlertSink) -> Result<Vec<LiveScanItem>> {
    let fixtures = api_football::fetch_live_fixtures(&cfg.api)?;
    info!(count = fixtures.len(), league = cfg.api.league_id, "live fixtures");

    let mut items = Vec::with_capacity(fixtures.len());
    for fx in &fixtures {
        let mut item = scan_item_shell(fx);
        if item.open_markets.is_empty() {
            items.push(item);
            continue;
        }
        if let Err(err) = scan_fixture(cfg, fx, sink, &mut item) {
            warn!(fixture_id = item.fixture_id, "live scan failed: {err:#}");
            item.error = Some(format!("{err:#}"));
        }
        items.push(item);
    }
    Ok(items)
}

fn scan_item_shell(fx: &Fixture) -> LiveScanItem {
    let home_goals = fx.goals.home.unwrap_or(0);
    let away_goals = fx.goals.away.unwrap_or(0);
    LiveScanItem {
        fixture_id: fx.fixture.id,
        home_team: fx.teams.home.name.clone(),
        away_team: fx.teams.away.name.clone(),
        elapsed: fx.elapsed(),
        score: (home_goals, away_goals),
        open_markets: open_markets(fx.elapsed(), home_goals, away_goals),
        probabilities: None,
        odds: MarketOdds::default(),
        alerts: Vec::new(),
        error: None,
    }
}

fn scan_fixture(
    cfg: &AppConfig,
    fx: &Fixture,
    sink: &dyn AlertSink,
    item: &mut LiveScanItem,
) -> Result<()> {
    require_team_ids(fx)?;
    let (home_fixtures, away_fixtures) = rayon::join(
        || api_football::fetch_team_fixtures(&cfg.api, fx.teams.home.id),
        || api_football::fetch_team_fixtures(&cfg.api, fx.teams.away.id),
    );
    let (home_fixtures, away_fixtures) = (home_fixtures?, away_fixtures?);
    require_history(&home_fixtures, &away_fixtures)?;
    let home_stats = compute_over_stats(&home_fixtures);
    let away_stats = compute_over_stats(&away_fixtures);
    let probabilities = estimate_match_probabilities(&home_stats, &away_stats, &cfg.model);
    item.probabilities = Some(probabilities);

    item.odds = api_football::fetch_fixture_odds(&cfg.api, fx.fixture.id)?;
    item.alerts = evaluate_alerts(
        &item.home_team,
        &item.away_team,
        &probabilities,
        &item.odds,
        &item.open_markets,
        &cfg.model,
        sink,
    );
    Ok(())
}

fn require_team_ids(fx: &Fixture) -> Result<()> {
    if fx.teams.home.id == 0 || fx.teams.away.id == 0 {
        bail!("fixture {} is missing a team id", fx.fixture.id);
    }
    Ok(())
}

// Without history the estimate is just the league prior; never alert on that.
fn require_history(home: &[Fixture], away: &[Fixture]) -> Result<()> {
    if home.is_empty() || away.is_empty() {
        bail!("no historic fixtures for one or both teams");
    }
    Ok(())
}
