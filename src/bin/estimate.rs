use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use overgoals::edge::decide_alert;
use overgoals::model::{Market, ModelConfig, TeamCounts, estimate_match_probabilities};

#[derive(Debug, serde::Deserialize)]
struct EstimateCase {
    #[serde(default)]
    home_team: Option<String>,
    #[serde(default)]
    away_team: Option<String>,
    home: TeamCounts,
    away: TeamCounts,
    #[serde(default)]
    odds_over05_ht: Option<f64>,
    #[serde(default)]
    odds_over15_ft: Option<f64>,
}

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/estimate_case.json"));

    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let case: EstimateCase = serde_json::from_str(&raw).context("invalid estimate case")?;

    // Offline: defaults only, no environment or network.
    let cfg = ModelConfig::default();
    let probs = estimate_match_probabilities(&case.home, &case.away, &cfg);

    println!(
        "{} vs {}",
        case.home_team.as_deref().unwrap_or("Home"),
        case.away_team.as_deref().unwrap_or("Away")
    );
    for market in Market::ALL {
        let result = probs.market(market);
        println!(
            "{:<12} p_mean {:>5.1}%  p_min {:>5.1}%",
            market.label(),
            result.p_mean * 100.0,
            result.p_min * 100.0
        );
        let odd = match market {
            Market::Over05Ht => case.odds_over05_ht,
            Market::Over15Ft => case.odds_over15_ft,
        };
        if let Some(odd) = odd {
            let d = decide_alert(result.p_min, odd, cfg.min_edge);
            println!(
                "{:<12} odd {:.2}  implied {:>5.1}%  edge {:+.1}%  alert {}",
                "",
                odd,
                d.implied_probability * 100.0,
                d.edge * 100.0,
                if d.should_alert { "yes" } else { "no" }
            );
        }
    }

    Ok(())
}
