use serde::Serialize;
use tracing::{info, warn};

use crate::config::TelegramConfig;
use crate::http_client::{http_client, send_for_body};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const HOT_EDGE: f64 = 0.10;

/// Delivery channel for alert text. Returns whether the message went out.
pub trait AlertSink {
    fn deliver(&self, text: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct AlertMessage<'a> {
    pub home_team: &'a str,
    pub away_team: &'a str,
    pub market: &'a str,
    pub p_min: f64,
    pub p_market: f64,
    pub edge: f64,
    pub odd: f64,
}

pub fn format_alert_message(alert: &AlertMessage<'_>) -> String {
    let emoji = if alert.edge >= HOT_EDGE { "🔥" } else { "✅" };
    let lines = [
        format!("{emoji} <b>VALUE FOUND</b> {emoji}"),
        String::new(),
        format!(
            "🏟 <b>{}</b> vs <b>{}</b>",
            alert.home_team, alert.away_team
        ),
        format!("📊 Market: <b>{}</b>", alert.market),
        String::new(),
        format!("🎯 P(conservative model): <b>{}</b>", pct(alert.p_min)),
        format!("📉 P(market): <b>{}</b>", pct(alert.p_market)),
        format!("💰 Edge: <b>{}</b>", signed_pct(alert.edge)),
        String::new(),
        format!("🎲 Current odd: <b>{:.2}</b>", alert.odd),
        String::new(),
        "⚠️ <i>Check the line-ups before entering!</i>".to_string(),
    ];
    lines.join("\n")
}

fn pct(p: f64) -> String {
    format!("{:.1}%", p * 100.0)
}

fn signed_pct(p: f64) -> String {
    format!("{:+.1}%", p * 100.0)
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    cfg: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(cfg: TelegramConfig) -> Self {
        Self { cfg }
    }

    fn send(&self, token: &str, chat_id: &str, text: &str) -> anyhow::Result<()> {
        let client = http_client()?;
        let url = format!("{TELEGRAM_API_BASE}/bot{token}/sendMessage");
        let payload = SendMessageRequest {
            chat_id,
            text,
            parse_mode: "HTML",
        };
        send_for_body(client.post(&url).json(&payload), "telegram sendMessage")?;
        Ok(())
    }
}

impl AlertSink for TelegramNotifier {
    fn deliver(&self, text: &str) -> bool {
        if !self.cfg.is_configured() {
            warn!("telegram not configured: TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID missing");
            return false;
        }
        let (Some(token), Some(chat_id)) = (
            self.cfg.bot_token.as_deref(),
            self.cfg.chat_id.as_deref(),
        ) else {
            return false;
        };
        match self.send(token, chat_id, text) {
            Ok(()) => {
                info!("telegram alert delivered");
                true
            }
            Err(err) => {
                // The token is part of the URL, keep it out of the log line.
                warn!(
                    "telegram delivery failed: {}",
                    format!("{err:#}").replace(token, "<token>")
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(edge: f64) -> AlertMessage<'static> {
        AlertMessage {
            home_team: "Benfica",
            away_team: "Porto",
            market: "Over 1.5 FT",
            p_min: 0.7234,
            p_market: 0.5,
            edge,
            odd: 2.0,
        }
    }

    #[test]
    fn message_carries_all_figures() {
        let msg = format_alert_message(&alert(0.2234));
        assert!(msg.starts_with("🔥"));
        assert!(msg.contains("<b>Benfica</b> vs <b>Porto</b>"));
        assert!(msg.contains("Market: <b>Over 1.5 FT</b>"));
        assert!(msg.contains("<b>72.3%</b>"));
        assert!(msg.contains("<b>50.0%</b>"));
        assert!(msg.contains("<b>+22.3%</b>"));
        assert!(msg.contains("<b>2.00</b>"));
    }

    #[test]
    fn modest_edge_uses_check_mark() {
        let msg = format_alert_message(&alert(0.06));
        assert!(msg.starts_with("✅"));
        assert!(msg.contains("+6.0%"));
    }

    #[test]
    fn unconfigured_telegram_reports_failure() {
        let notifier = TelegramNotifier::new(TelegramConfig::default());
        assert!(!notifier.deliver("hello"));
    }
}
