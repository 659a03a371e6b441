//! HTTP client for the element classification service.
//!
//! Two form-encoded POST endpoints, both answering with JSON:
//! - `/classify`: screenshot + page source + label in, element geometry out
//! - `/add_action`: usage report for an element the driver found natively
//!
//! No retries and no timeout of its own; the `reqwest::Client` handed in
//! decides those.

use serde::{Deserialize, Deserializer, Serialize};

use crate::geometry::Rect;
use crate::result::ClientError;

/// Default classification service
pub const DEFAULT_SERVER_URL: &str = "https://sdk.test.ai";

/// Element geometry as reported by the service, in raw screenshot pixels
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceElement {
    /// X position
    #[serde(deserialize_with = "pixel")]
    pub x: i32,
    /// Y position
    #[serde(deserialize_with = "pixel")]
    pub y: i32,
    /// Width
    #[serde(deserialize_with = "pixel")]
    pub width: i32,
    /// Height
    #[serde(deserialize_with = "pixel")]
    pub height: i32,
    /// Text the classifier read off the element
    #[serde(default, deserialize_with = "opaque_text")]
    pub text: String,
    /// Element class / tag
    #[serde(rename = "class", default, deserialize_with = "opaque_text")]
    pub class_name: String,
}

impl ServiceElement {
    /// Raw pixel rectangle
    #[must_use]
    pub const fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Accept integers or floats, truncating the latter
fn pixel<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let value = f64::deserialize(deserializer)?;
    Ok(value.trunc() as i32)
}

/// Service identifiers and labels are opaque: keep strings as they are,
/// render any other non-null JSON value as text.
fn opaque(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

fn opaque_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(opaque(serde_json::Value::deserialize(deserializer)?))
}

fn opaque_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(opaque(serde_json::Value::deserialize(deserializer)?).unwrap_or_default())
}

/// Reply from `/classify`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServiceReply {
    /// Whether the element was identified
    #[serde(default)]
    pub success: bool,
    /// Training key for the label, when the service assigned one
    #[serde(default, deserialize_with = "opaque_string")]
    pub key: Option<String>,
    /// Element geometry on success
    #[serde(default)]
    pub elem: Option<ServiceElement>,
    /// Free-text failure reason
    #[serde(default, deserialize_with = "opaque_string")]
    pub message: Option<String>,
    /// The full JSON body as received
    #[serde(skip)]
    pub raw: serde_json::Value,
}

/// Usage report for `/add_action`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageReport {
    /// Training key from the preceding classification
    pub key: Option<String>,
    /// Element rectangle as the native driver reports it
    pub rect: Rect,
    /// Session density multiplier
    pub multiplier: f64,
    /// Ask the service to train on this observation if needed
    pub train_if_necessary: bool,
}

#[derive(Debug, Serialize)]
struct ClassifyForm<'a> {
    screenshot: &'a str,
    source: &'a str,
    api_key: &'a str,
    label: &'a str,
    run_id: &'a str,
}

#[derive(Debug, Serialize)]
struct AddActionForm<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<&'a str>,
    api_key: &'a str,
    run_id: &'a str,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    multiplier: f64,
    train_if_necessary: bool,
}

/// Classification service client bound to one session's credentials.
///
/// Cloning shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ClassificationClient {
    base_url: String,
    client: reqwest::Client,
    api_key: String,
    run_id: String,
}

impl ClassificationClient {
    /// Create a client with a default `reqwest::Client`
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        run_id: impl Into<String>,
    ) -> Self {
        Self::with_client(base_url, api_key, run_id, reqwest::Client::new())
    }

    /// Create a client with a custom reqwest client (for timeouts, TLS, etc.)
    pub fn with_client(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        run_id: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            api_key: api_key.into(),
            run_id: run_id.into(),
        }
    }

    /// Returns the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the run id sent with every request
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Full URL for an endpoint
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Ask the service to identify `label` on the current screen.
    pub async fn classify(
        &self,
        label: &str,
        screenshot: &str,
        source: &str,
    ) -> Result<ServiceReply, ClientError> {
        let form = ClassifyForm {
            screenshot,
            source,
            api_key: &self.api_key,
            label,
            run_id: &self.run_id,
        };
        let resp = self.post_form("classify", &form).await?;

        let raw: serde_json::Value = serde_json::from_slice(&resp.bytes().await?)?;
        let mut reply: ServiceReply = serde_json::from_value(raw.clone())?;
        reply.raw = raw;
        Ok(reply)
    }

    /// Report that an element was used. The reply body is discarded.
    pub async fn record_usage(&self, report: &UsageReport) -> Result<(), ClientError> {
        let form = AddActionForm {
            key: report.key.as_deref(),
            api_key: &self.api_key,
            run_id: &self.run_id,
            x: report.rect.x,
            y: report.rect.y,
            width: report.rect.width,
            height: report.rect.height,
            multiplier: report.multiplier,
            train_if_necessary: report.train_if_necessary,
        };
        let resp = self.post_form("add_action", &form).await?;
        drop(resp.bytes().await?);
        Ok(())
    }

    async fn post_form<T: Serialize + ?Sized>(
        &self,
        path: &str,
        form: &T,
    ) -> Result<reqwest::Response, ClientError> {
        let resp = self
            .client
            .post(self.endpoint(path))
            .form(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }
}
