use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use overgoals::config::AppConfig;
use overgoals::live;
use overgoals::notifier::TelegramNotifier;
use overgoals::predict::{self, PredictError, PredictionRequest};

const USAGE: &str = "usage:
  overgoals predict <home team> <away team> [--season N] [--no-alert]
  overgoals live";

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing();

    let cfg = AppConfig::from_env();
    let notifier = TelegramNotifier::new(cfg.telegram.clone());
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    match args.first().map(String::as_str) {
        Some("predict") => {
            let req = parse_predict_args(&args[1..])?;
            match predict::predict(&cfg, &req, &notifier) {
                Ok(report) => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    Ok(())
                }
                Err(PredictError::TeamNotFound(name)) => {
                    Err(anyhow::anyhow!("team not found: {name}"))
                }
                Err(err) => Err(anyhow::Error::new(err).context("prediction failed")),
            }
        }
        Some("live") => {
            let items = live::scan_live(&cfg, &notifier).context("live scan failed")?;
            println!("{}", serde_json::to_string_pretty(&items)?);
            Ok(())
        }
        _ => {
            eprintln!("{USAGE}");
            Err(anyhow::anyhow!("missing or unknown command"))
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_predict_args(args: &[String]) -> Result<PredictionRequest> {
    let mut positional = Vec::new();
    let mut season_for_odds = None;
    let mut send_alert = true;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(raw) = arg.strip_prefix("--season=") {
            season_for_odds = Some(parse_season(raw)?);
            continue;
        }
        match arg.as_str() {
            "--season" => {
                let raw = iter.next().context("--season needs a value")?;
                season_for_odds = Some(parse_season(raw)?);
            }
            "--no-alert" => send_alert = false,
            other => positional.push(other.trim().to_string()),
        }
    }

    let [home_team, away_team] = <[String; 2]>::try_from(positional)
        .map_err(|_| anyhow::anyhow!("expected <home team> <away team>\n{USAGE}"))?;
    Ok(PredictionRequest {
        home_team,
        away_team,
        season_for_odds,
        send_alert,
    })
}

fn parse_season(raw: &str) -> Result<u16> {
    raw.trim()
        .parse::<u16>()
        .with_context(|| format!("invalid season: {raw}"))
}
