use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::beta;

pub const DEFAULT_CONF_LEVEL: f64 = 0.05;
pub const DEFAULT_MIN_EDGE: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimateError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    #[serde(rename = "over05_ht")]
    Over05Ht,
    #[serde(rename = "over15_ft")]
    Over15Ft,
}

impl Market {
    pub const ALL: [Market; 2] = [Market::Over05Ht, Market::Over15Ft];

    pub fn key(self) -> &'static str {
        match self {
            Market::Over05Ht => "over05_ht",
            Market::Over15Ft => "over15_ft",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Market::Over05Ht => "Over 0.5 HT",
            Market::Over15Ft => "Over 1.5 FT",
        }
    }
}

/// Successes out of trials for one team in one market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ObservationCount {
    successes: u32,
    trials: u32,
}

impl ObservationCount {
    pub fn new(successes: u32, trials: u32) -> Result<Self, EstimateError> {
        if successes > trials {
            return Err(EstimateError::InvalidInput(format!(
                "successes ({successes}) exceed trials ({trials})"
            )));
        }
        Ok(Self { successes, trials })
    }

    pub fn successes(&self) -> u32 {
        self.successes
    }

    pub fn trials(&self) -> u32 {
        self.trials
    }

    pub fn failures(&self) -> u32 {
        self.trials - self.successes
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct RawTeamCounts {
    over_05_ht_successes: u32,
    over_05_ht_trials: u32,
    over_15_ft_successes: u32,
    over_15_ft_trials: u32,
}

/// Per-team history in the flat shape the fixture provider produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "RawTeamCounts")]
pub struct TeamCounts {
    pub over_05_ht: ObservationCount,
    pub over_15_ft: ObservationCount,
}

impl TeamCounts {
    pub fn new(
        ht_successes: u32,
        ht_trials: u32,
        ft_successes: u32,
        ft_trials: u32,
    ) -> Result<Self, EstimateError> {
        Ok(Self {
            over_05_ht: ObservationCount::new(ht_successes, ht_trials)?,
            over_15_ft: ObservationCount::new(ft_successes, ft_trials)?,
        })
    }

    pub fn for_market(&self, market: Market) -> ObservationCount {
        match market {
            Market::Over05Ht => self.over_05_ht,
            Market::Over15Ft => self.over_15_ft,
        }
    }
}

impl TryFrom<RawTeamCounts> for TeamCounts {
    type Error = EstimateError;

    fn try_from(raw: RawTeamCounts) -> Result<Self, Self::Error> {
        TeamCounts::new(
            raw.over_05_ht_successes,
            raw.over_05_ht_trials,
            raw.over_15_ft_successes,
            raw.over_15_ft_trials,
        )
    }
}

impl Serialize for TeamCounts {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("TeamCounts", 4)?;
        s.serialize_field("over_05_ht_successes", &self.over_05_ht.successes)?;
        s.serialize_field("over_05_ht_trials", &self.over_05_ht.trials)?;
        s.serialize_field("over_15_ft_successes", &self.over_15_ft.successes)?;
        s.serialize_field("over_15_ft_trials", &self.over_15_ft.trials)?;
        s.end()
    }
}

/// Pseudo-counts encoding the league-average belief for one market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prior {
    a0: f64,
    b0: f64,
}

impl Prior {
    pub fn new(a0: f64, b0: f64) -> Result<Self, EstimateError> {
        if !(a0.is_finite() && b0.is_finite() && a0 > 0.0 && b0 > 0.0) {
            return Err(EstimateError::InvalidInput(format!(
                "prior pseudo-counts must be positive, got ({a0}, {b0})"
            )));
        }
        Ok(Self { a0, b0 })
    }

    pub fn a0(&self) -> f64 {
        self.a0
    }

    pub fn b0(&self) -> f64 {
        self.b0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Posterior {
    pub a: f64,
    pub b: f64,
}

impl Posterior {
    pub fn mean(&self) -> f64 {
        let total = self.a + self.b;
        if total > 0.0 { self.a / total } else { 0.0 }
    }

    /// Value with only `alpha` of the posterior mass below it. Numerical failure yields 0.0.
    pub fn lower_quantile(&self, alpha: f64) -> f64 {
        let q = beta::quantile(alpha, self.a, self.b);
        if q.is_finite() { q } else { 0.0 }
    }
}

/// Injected model parameters: one prior per market, the quantile level and the alert margin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelConfig {
    pub prior_ht: Prior,
    pub prior_ft: Prior,
    pub confidence_level: f64,
    pub min_edge: f64,
}

impl ModelConfig {
    pub fn new(
        prior_ht: Prior,
        prior_ft: Prior,
        confidence_level: f64,
        min_edge: f64,
    ) -> Result<Self, EstimateError> {
        if !(confidence_level > 0.0 && confidence_level < 1.0) {
            return Err(EstimateError::InvalidInput(format!(
                "confidence level must be in (0, 1), got {confidence_level}"
            )));
        }
        if !min_edge.is_finite() {
            return Err(EstimateError::InvalidInput(format!(
                "minimum edge must be finite, got {min_edge}"
            )));
        }
        Ok(Self {
            prior_ht,
            prior_ft,
            confidence_level,
            min_edge,
        })
    }

    pub fn prior_for(&self, market: Market) -> Prior {
        match market {
            Market::Over05Ht => self.prior_ht,
            Market::Over15Ft => self.prior_ft,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        // HT over 0.5: league ~0.80 ; FT over 1.5: league ~0.75 ; both worth 40 virtual games.
        Self {
            prior_ht: Prior { a0: 32.0, b0: 8.0 },
            prior_ft: Prior { a0: 30.0, b0: 10.0 },
            confidence_level: DEFAULT_CONF_LEVEL,
            min_edge: DEFAULT_MIN_EDGE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketResult {
    pub p_mean: f64,
    pub p_min: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Posteriors {
    pub home_ht: Posterior,
    pub away_ht: Posterior,
    pub home_ft: Posterior,
    pub away_ft: Posterior,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchProbabilities {
    pub over05_ht: MarketResult,
    pub over15_ft: MarketResult,
    pub posteriors: Posteriors,
}

impl MatchProbabilities {
    pub fn market(&self, market: Market) -> MarketResult {
        match market {
            Market::Over05Ht => self.over05_ht,
            Market::Over15Ft => self.over15_ft,
        }
    }
}

pub fn build_posterior(count: ObservationCount, prior: Prior) -> Posterior {
    Posterior {
        a: prior.a0 + f64::from(count.successes),
        b: prior.b0 + f64::from(count.failures()),
    }
}

pub fn combine(p1: f64, p2: f64) -> f64 {
    (p1 + p2) / 2.0
}

// Averages the two quantiles rather than taking a quantile of the mixture; alert
// frequency depends on this exact heuristic.
fn combine_market(home: &Posterior, away: &Posterior, confidence_level: f64) -> MarketResult {
    MarketResult {
        p_mean: combine(home.mean(), away.mean()),
        p_min: combine(
            home.lower_quantile(confidence_level),
            away.lower_quantile(confidence_level),
        ),
    }
}

pub fn estimate_match_probabilities(
    home: &TeamCounts,
    away: &TeamCounts,
    cfg: &ModelConfig,
) -> MatchProbabilities {
    let posterior = |team: &TeamCounts, market: Market| {
        build_posterior(team.for_market(market), cfg.prior_for(market))
    };
    let home_ht = posterior(home, Market::Over05Ht);
    let away_ht = posterior(away, Market::Over05Ht);
    let home_ft = posterior(home, Market::Over15Ft);
    let away_ft = posterior(away, Market::Over15Ft);

    MatchProbabilities {
        over05_ht: combine_market(&home_ht, &away_ht, cfg.confidence_level),
        over15_ft: combine_market(&home_ft, &away_ft, cfg.confidence_level),
        posteriors: Posteriors {
            home_ht,
            away_ht,
            home_ft,
            away_ft,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(s: u32, n: u32) -> ObservationCount {
        ObservationCount::new(s, n).unwrap()
    }

    #[test]
    fn rejects_successes_above_trials() {
        assert!(matches!(
            ObservationCount::new(4, 3),
            Err(EstimateError::InvalidInput(_))
        ));
        assert!(TeamCounts::new(1, 2, 5, 4).is_err());
    }

    #[test]
    fn rejects_non_positive_priors() {
        assert!(Prior::new(0.0, 8.0).is_err());
        assert!(Prior::new(32.0, -1.0).is_err());
        assert!(Prior::new(f64::NAN, 8.0).is_err());
        assert!(Prior::new(32.0, 8.0).is_ok());
    }

    #[test]
    fn config_rejects_out_of_range_confidence() {
        let d = ModelConfig::default();
        assert!(ModelConfig::new(d.prior_ht, d.prior_ft, 0.0, 0.05).is_err());
        assert!(ModelConfig::new(d.prior_ht, d.prior_ft, 1.0, 0.05).is_err());
        assert!(ModelConfig::new(d.prior_ht, d.prior_ft, 0.1, f64::NAN).is_err());
    }

    #[test]
    fn empty_history_collapses_to_prior() {
        for (a0, b0) in [(32.0, 8.0), (30.0, 10.0), (0.5, 7.25), (3.0, 3.0)] {
            let prior = Prior::new(a0, b0).unwrap();
            let post = build_posterior(count(0, 0), prior);
            assert_eq!(post.mean(), a0 / (a0 + b0));
        }
    }

    #[test]
    fn posterior_adds_counts_to_prior() {
        let prior = Prior::new(32.0, 8.0).unwrap();
        let post = build_posterior(count(8, 10), prior);
        assert_eq!(post, Posterior { a: 40.0, b: 10.0 });
    }

    #[test]
    fn mean_is_monotone_in_successes() {
        let prior = Prior::new(30.0, 10.0).unwrap();
        let mut last = f64::MIN;
        for s in 0..=20 {
            let m = build_posterior(count(s, 20), prior).mean();
            assert!(m >= last);
            last = m;
        }
    }

    #[test]
    fn right_skewed_quantile_stays_below_mean_up_to_median() {
        let post = Posterior { a: 8.0, b: 30.0 };
        for alpha in [0.05, 0.25, 0.45, 0.499] {
            assert!(post.lower_quantile(alpha) <= post.mean());
        }
    }

    #[test]
    fn degenerate_mean_is_zero() {
        assert_eq!(Posterior { a: 0.0, b: 0.0 }.mean(), 0.0);
    }

    #[test]
    fn lower_quantile_is_monotone_and_below_mean() {
        let post = Posterior { a: 35.0, b: 15.0 };
        let mut last = 0.0;
        // Left-skewed (a > b): the median sits above the mean, so stay in the lower tail.
        for alpha in [0.001, 0.01, 0.05, 0.1, 0.25] {
            let q = post.lower_quantile(alpha);
            assert!(q >= last);
            assert!(q <= post.mean());
            last = q;
        }
    }

    #[test]
    fn lower_quantile_degrades_to_zero() {
        assert_eq!(Posterior { a: f64::NAN, b: 1.0 }.lower_quantile(0.05), 0.0);
        assert_eq!(Posterior { a: 0.0, b: 0.0 }.lower_quantile(0.05), 0.0);
    }

    #[test]
    fn small_perfect_record_is_not_certainty() {
        let prior = Prior::new(32.0, 8.0).unwrap();
        let post = build_posterior(count(3, 3), prior);
        assert!(post.lower_quantile(DEFAULT_CONF_LEVEL) < 0.9);
        assert!(post.mean() < 1.0);
    }

    #[test]
    fn combine_is_idempotent_and_averages() {
        for p in [0.0, 0.13, 0.5, 0.8, 1.0] {
            assert_eq!(combine(p, p), p);
        }
        assert_eq!(combine(0.0, 1.0), 0.5);
    }

    #[test]
    fn half_time_scenario() {
        let cfg = ModelConfig::default();
        let home = TeamCounts::new(8, 10, 0, 0).unwrap();
        let away = TeamCounts::new(3, 10, 0, 0).unwrap();
        let probs = estimate_match_probabilities(&home, &away, &cfg);

        assert_eq!(probs.posteriors.home_ht, Posterior { a: 40.0, b: 10.0 });
        assert_eq!(probs.posteriors.away_ht, Posterior { a: 35.0, b: 15.0 });
        assert!((probs.posteriors.home_ht.mean() - 0.80).abs() < 1e-12);
        assert!((probs.posteriors.away_ht.mean() - 0.70).abs() < 1e-12);
        assert!((probs.over05_ht.p_mean - 0.75).abs() < 1e-12);
        assert!(probs.over05_ht.p_min < 0.75);
        assert!(probs.over05_ht.p_min > 0.5);
    }

    #[test]
    fn no_data_reproduces_league_averages() {
        let cfg = ModelConfig::default();
        let empty = TeamCounts::default();
        let probs = estimate_match_probabilities(&empty, &empty, &cfg);

        assert_eq!(probs.over05_ht.p_mean, 0.80);
        assert_eq!(probs.over15_ft.p_mean, 0.75);
        let prior_q = build_posterior(count(0, 0), cfg.prior_ht).lower_quantile(0.05);
        assert_eq!(probs.over05_ht.p_min, prior_q);
        assert!(probs.over05_ht.p_min > 0.0);
        assert!(probs.over15_ft.p_min > 0.0);
    }

    #[test]
    fn team_counts_deserialize_validates() {
        let ok: TeamCounts = serde_json::from_str(
            r#"{"over_05_ht_successes":7,"over_05_ht_trials":10,"over_15_ft_successes":6,"over_15_ft_trials":10}"#,
        )
        .unwrap();
        assert_eq!(ok.over_05_ht.successes(), 7);
        assert_eq!(ok.for_market(Market::Over15Ft).trials(), 10);

        let bad = serde_json::from_str::<TeamCounts>(
            r#"{"over_05_ht_successes":11,"over_05_ht_trials":10,"over_15_ft_successes":6,"over_15_ft_trials":10}"#,
        );
        assert!(bad.is_err());
    }
}
