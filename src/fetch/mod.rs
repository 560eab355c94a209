mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Result, anyhow};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// POSTs `body` as JSON to `url` and decodes the JSON response.
///
/// # Errors
///
/// Fails on transport errors, on any non-2xx status (the status and response
/// body are included in the message), and on a response that does not decode
/// into `T`.
pub async fn send_json<C, B, T>(client: &C, url: &str, body: &B) -> Result<T>
where
    C: HttpClient + ?Sized,
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let mut req = reqwest::Request::new(reqwest::Method::POST, url.parse()?);
    req.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    *req.body_mut() = Some(serde_json::to_vec(body)?.into());

    let response = client
        .execute(req)
        .await
        .map_err(|e| anyhow!("Failed to send request: {}", e))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!("API returned status {}: {}", status, body));
    }

    response
        .json()
        .await
        .map_err(|e| anyhow!("Failed to parse response: {}", e))
}
