use std::env;

use tracing::warn;

use crate::model::{DEFAULT_CONF_LEVEL, DEFAULT_MIN_EDGE, ModelConfig, Prior};

const DEFAULT_API_BASE_URL: &str = "https://v3.football.api-sports.io";
const DEFAULT_LEAGUE_ID: u32 = 94;
const DEFAULT_SEASONS: [u16; 5] = [2020, 2021, 2022, 2023, 2024];
const DEFAULT_BOOKMAKER_ID: u32 = 8;
const DEFAULT_ODDS_SEASON: u16 = 2024;

#[derive(Debug, Clone)]
pub struct ApiFootballConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub league_id: u32,
    pub historic_seasons: Vec<u16>,
    pub bookmaker_id: u32,
}

#[derive(Debug, Clone, Default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiFootballConfig,
    pub telegram: TelegramConfig,
    pub model: ModelConfig,
    pub default_odds_season: u16,
}

impl AppConfig {
    /// Reads the process environment. Call `dotenvy` first if `.env` files should apply.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let opt = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api = ApiFootballConfig {
            api_key: opt("API_FOOTBALL_KEY"),
            base_url: opt("API_FOOTBALL_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            league_id: opt("LEAGUE_ID")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(DEFAULT_LEAGUE_ID),
            historic_seasons: opt("HISTORIC_SEASONS")
                .map(|v| parse_seasons(&v))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SEASONS.to_vec()),
            bookmaker_id: opt("ODDS_BOOKMAKER_ID")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(DEFAULT_BOOKMAKER_ID),
        };

        let telegram = TelegramConfig {
            bot_token: opt("TELEGRAM_BOT_TOKEN"),
            chat_id: opt("TELEGRAM_CHAT_ID"),
        };

        let confidence_level = opt("CONF_LEVEL")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(DEFAULT_CONF_LEVEL)
            .clamp(0.001, 0.499);
        let min_edge = opt("MIN_EDGE_ALERT")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(DEFAULT_MIN_EDGE)
            .clamp(-1.0, 1.0);

        let defaults = ModelConfig::default();
        let prior_ht = prior_from(&opt, "PRIOR_HT_A", "PRIOR_HT_B", defaults.prior_ht);
        let prior_ft = prior_from(&opt, "PRIOR_FT_A", "PRIOR_FT_B", defaults.prior_ft);
        let model = ModelConfig::new(prior_ht, prior_ft, confidence_level, min_edge)
            .unwrap_or(defaults);

        let default_odds_season = opt("ODDS_SEASON")
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_ODDS_SEASON);

        Self {
            api,
            telegram,
            model,
            default_odds_season,
        }
    }
}

fn prior_from(
    opt: &impl Fn(&str) -> Option<String>,
    key_a: &str,
    key_b: &str,
    fallback: Prior,
) -> Prior {
    let a = opt(key_a).and_then(|v| v.parse::<f64>().ok());
    let b = opt(key_b).and_then(|v| v.parse::<f64>().ok());
    match (a, b) {
        (None, None) => fallback,
        (a, b) => {
            let a = a.unwrap_or(fallback.a0());
            let b = b.unwrap_or(fallback.b0());
            Prior::new(a, b).unwrap_or_else(|err| {
                warn!("ignoring {key_a}/{key_b}: {err}");
                fallback
            })
        }
    }
}

fn parse_seasons(raw: &str) -> Vec<u16> {
    let mut out: Vec<u16> = raw
        .split([',', ';', ' '])
        .filter_map(|part| part.trim().parse::<u16>().ok())
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}
