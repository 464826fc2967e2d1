use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::api_football::{self, MarketOdds};
use crate::config::AppConfig;
use crate::edge::decide_alert;
use crate::model::{Market, MatchProbabilities, ModelConfig, TeamCounts, estimate_match_probabilities};
use crate::notifier::{AlertMessage, AlertSink, format_alert_message};
use crate::stats::compute_over_stats;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("team not found: {0}")]
    TeamNotFound(String),
    #[error("no historic fixtures found for one or both teams")]
    NoHistory,
    #[error(transparent)]
    Fetch(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionRequest {
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub season_for_odds: Option<u16>,
    #[serde(default = "default_send_alert")]
    pub send_alert: bool,
}

fn default_send_alert() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertOutcome {
    pub market: String,
    pub sent: bool,
    pub edge: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RawStats {
    pub home: TeamCounts,
    pub away: TeamCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    pub home_team: String,
    pub away_team: String,
    pub probabilities: MatchProbabilities,
    pub odds_found: MarketOdds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odds_warning: Option<String>,
    pub alerts: Vec<AlertOutcome>,
    pub debug_stats: RawStats,
    pub generated_at: String,
}

pub fn predict(
    cfg: &AppConfig,
    req: &PredictionRequest,
    sink: &dyn AlertSink,
) -> Result<PredictionReport, PredictError> {
    let home_id = api_football::find_team_id(&cfg.api, &req.home_team)?
        .ok_or_else(|| PredictError::TeamNotFound(req.home_team.clone()))?;
    let away_id = api_football::find_team_id(&cfg.api, &req.away_team)?
        .ok_or_else(|| PredictError::TeamNotFound(req.away_team.clone()))?;

    let (home_fixtures, away_fixtures) = rayon::join(
        || api_football::fetch_team_fixtures(&cfg.api, home_id),
        || api_football::fetch_team_fixtures(&cfg.api, away_id),
    );
    let (home_fixtures, away_fixtures) = (home_fixtures?, away_fixtures?);
    if home_fixtures.is_empty() || away_fixtures.is_empty() {
        return Err(PredictError::NoHistory);
    }

    let home_stats = compute_over_stats(&home_fixtures);
    let away_stats = compute_over_stats(&away_fixtures);
    let probabilities = estimate_match_probabilities(&home_stats, &away_stats, &cfg.model);
    info!(
        home = %req.home_team,
        away = %req.away_team,
        ht_p_min = probabilities.over05_ht.p_min,
        ft_p_min = probabilities.over15_ft.p_min,
        "estimated match probabilities"
    );

    let season = req.season_for_odds.unwrap_or(cfg.default_odds_season);
    let (odds_found, odds_warning) =
        match api_football::fetch_h2h_odds(&cfg.api, home_id, away_id, season) {
            Ok(odds) => (odds, None),
            Err(err) => {
                warn!("odds fetch failed: {err:#}");
                (
                    MarketOdds::default(),
                    Some("Failed to fetch odds or fixture.".to_string()),
                )
            }
        };

    let alerts = if req.send_alert {
        evaluate_alerts(
            &req.home_team,
            &req.away_team,
            &probabilities,
            &odds_found,
            &Market::ALL,
            &cfg.model,
            sink,
        )
    } else {
        Vec::new()
    };

    Ok(PredictionReport {
        home_team: req.home_team.clone(),
        away_team: req.away_team.clone(),
        probabilities,
        odds_found,
        odds_warning,
        alerts,
        debug_stats: RawStats {
            home: home_stats,
            away: away_stats,
        },
        generated_at: Utc::now().to_rfc3339(),
    })
}

/// Notifies for every open market whose conservative estimate clears the market by the
/// configured margin. Markets without a quoted odd are skipped.
pub fn evaluate_alerts(
    home_team: &str,
    away_team: &str,
    probabilities: &MatchProbabilities,
    odds: &MarketOdds,
    open_markets: &[Market],
    model: &ModelConfig,
    sink: &dyn AlertSink,
) -> Vec<AlertOutcome> {
    let mut out = Vec::new();
    for &market in open_markets {
        // A zero or missing price means the market is not quoted.
        let Some(odd) = odds.get(market).filter(|o| o.is_finite() && *o != 0.0) else {
            continue;
        };
        let p_min = probabilities.market(market).p_min;
        let decision = decide_alert(p_min, odd, model.min_edge);
        if !decision.odds_usable {
            warn!(market = market.key(), odd, "odd <= 1.0, implied probability taken as 0");
        }
        if !decision.should_alert {
            continue;
        }

        let text = format_alert_message(&AlertMessage {
            home_team,
            away_team,
            market: market.label(),
            p_min,
            p_market: decision.implied_probability,
            edge: decision.edge,
            odd,
        });
        let sent = sink.deliver(&text);
        out.push(AlertOutcome {
            market: market.label().to_string(),
            sent,
            edge: round4(decision.edge),
        });
    }
    out
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_to_sending_alerts() {
        let req: PredictionRequest =
            serde_json::from_str(r#"{"home_team":"Benfica","away_team":"Porto"}"#).unwrap();
        assert!(req.send_alert);
        assert!(req.season_for_odds.is_none());
    }

    #[test]
    fn rounds_edges_to_four_places() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(-0.00004), -0.0);
    }
}
