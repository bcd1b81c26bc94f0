//! OpenAI-compatible chat completions over a blocking HTTP client.
//!
//! With `api_version` set the endpoint is addressed the Azure OpenAI way:
//! `{base}/openai/deployments/{model}/chat/completions?api-version=...` and
//! an `api-key` header instead of a bearer token.
use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde_json::{json, Value};
use std::net::IpAddr;
use std::time::Duration;

use docqa_core::config::GenerationSettings;
use docqa_core::traits::Generator;

#[derive(Debug, Clone)]
enum Auth { Bearer(String), AzureKey(String), Anonymous }

pub struct ChatCompletionsGenerator {
    client: Client,
    url: String,
    auth: Auth,
    model: String,
    temperature: f32,
}

impl ChatCompletionsGenerator {
    /// The API key comes from `api_key`, then the env var named by
    /// `api_key_env`. Endpoints on localhost or a loopback address may run
    /// without one.
    pub fn from_settings(settings: &GenerationSettings) -> Result<Self> {
        let key = settings.api_key.clone().or_else(|| std::env::var(&settings.api_key_env).ok()).filter(|k| !k.trim().is_empty());
        let auth = match (key, &settings.api_version) {
            (Some(k), Some(_)) => Auth::AzureKey(k),
            (Some(k), None) => Auth::Bearer(k),
            (None, _) if is_local(&settings.base_url) => Auth::Anonymous,
            (None, _) => bail!("no API key for {}: set generation.api_key or {}", settings.base_url, settings.api_key_env),
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("building HTTP client")?;
        let url = endpoint(settings);
        tracing::debug!(url = %url, model = %settings.model, "chat completions generator ready");
        Ok(Self { client, url, auth, model: settings.model.clone(), temperature: settings.temperature })
    }

    pub fn url(&self) -> &str { &self.url }
}

impl Generator for ChatCompletionsGenerator {
    fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
        });
        let request = match &self.auth {
            Auth::Bearer(k) => self.client.post(&self.url).bearer_auth(k),
            Auth::AzureKey(k) => self.client.post(&self.url).header("api-key", k),
            Auth::Anonymous => self.client.post(&self.url),
        };
        let response = request.json(&body).send().map_err(|e| anyhow!("request to {} failed: {e}", self.url))?;
        let status = response.status();
        let text = response.text().context("reading completion response body")?;
        if !status.is_success() { return Err(map_http_error(status, &text)); }
        let json: Value = serde_json::from_str(&text).context("completion response is not JSON")?;
        parse_response(&json)
    }
}

pub fn endpoint(settings: &GenerationSettings) -> String {
    let base = settings.base_url.trim_end_matches('/');
    match &settings.api_version {
        Some(v) => format!("{base}/openai/deployments/{}/chat/completions?api-version={v}", settings.model),
        None => format!("{base}/chat/completions"),
    }
}

/// Exact host comparison: `localhost` or a loopback address.
fn is_local(base_url: &str) -> bool {
    let Ok(url) = Url::parse(base_url) else { return false };
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback()),
        None => false,
    }
}

/// Text of the first choice.
pub fn parse_response(body: &Value) -> Result<String> {
    let choice = body
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| anyhow!("no choices in completion response"))?;
    choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("completion choice has no message content"))
}

fn map_http_error(status: StatusCode, body: &str) -> anyhow::Error {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error")?.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string());
    match status.as_u16() {
        401 | 403 => anyhow!("authentication failed ({status}): {detail}"),
        429 => anyhow!("rate limited ({status}): {detail}"),
        s if s >= 500 => anyhow!("server error ({status}): {detail}"),
        _ => anyhow!("HTTP {status}: {detail}"),
    }
}
