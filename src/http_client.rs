use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::USER_AGENT;

const REQUEST_TIMEOUT_SECS: u64 = 20;
const ERROR_SNIPPET_CHARS: usize = 220;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// Sends the request and returns the body, turning non-2xx statuses into errors.
pub fn send_for_body(req: RequestBuilder, what: &str) -> Result<String> {
    let resp = req
        .header(USER_AGENT, "overgoals/0.1")
        .send()
        .with_context(|| format!("{what} request failed"))?;
    let status = resp.status();
    let body = resp
        .text()
        .with_context(|| format!("failed reading {what} body"))?;
    if !status.is_success() {
        return Err(anyhow::anyhow!(
            "{what} http {}: {}",
            status,
            error_snippet(&body)
        ));
    }
    Ok(body)
}

pub fn error_snippet(body: &str) -> String {
    body.trim()
        .replace(['\n', '\r'], " ")
        .chars()
        .take(ERROR_SNIPPET_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_flattens_and_truncates() {
        let body = format!("  line one\r\nline two {}", "x".repeat(400));
        let snippet = error_snippet(&body);
        assert!(snippet.starts_with("line one  line two"));
        assert_eq!(snippet.chars().count(), ERROR_SNIPPET_CHARS);
    }
}
