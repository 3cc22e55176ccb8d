//! reqwest-backed [`PolicyBackend`] talking to the approval policy REST endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::Value;
use spendgate_core::config::BackendConfig;
use spendgate_core::errors::BackendError;
use spendgate_core::rules::payload::{CreatedPolicy, PolicyPayload, PolicyRecord};
use spendgate_core::session::PolicyBackend;
use tracing::{debug, info, warn};

const CREATE_PATH: &str = "policies/create";
const LIST_PATH: &str = "policies/all";
const DETAILS_PATH: &str = "policies/details";

#[derive(Clone, Debug)]
pub struct HttpPolicyBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpPolicyBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| BackendError::Network { message: error.to_string() })?;
        Ok(Self { client, config: config.clone() })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.api_token.as_ref().map(|token| token.expose_secret()) {
            Some(token) if !token.trim().is_empty() => request.bearer_auth(token),
            _ => request,
        }
    }

    async fn send(&self, request: RequestBuilder, endpoint: &str) -> Result<String, BackendError> {
        let response = self.authorize(request).send().await.map_err(|error| {
            warn!(
                event_name = "client.policy.request_failed",
                endpoint,
                error = %error,
                "policy backend request failed"
            );
            BackendError::Network { message: error.to_string() }
        })?;
        read_body(response, endpoint).await
    }
}

async fn read_body(response: Response, endpoint: &str) -> Result<String, BackendError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|error| BackendError::Decode { message: error.to_string() })?;

    if !status.is_success() {
        warn!(
            event_name = "client.policy.rejected",
            endpoint,
            status = status.as_u16(),
            "policy backend returned an error status"
        );
        return Err(BackendError::Status {
            status: status.as_u16(),
            message: server_message(&body),
        });
    }

    debug!(event_name = "client.policy.response", endpoint, status = status.as_u16());
    Ok(body)
}

#[async_trait]
impl PolicyBackend for HttpPolicyBackend {
    async fn create_policy(&self, payload: &PolicyPayload) -> Result<CreatedPolicy, BackendError> {
        let endpoint = self.config.endpoint(CREATE_PATH);
        let body = self.send(self.client.post(&endpoint).json(payload), &endpoint).await?;

        let created = decode_created(&body)?;
        info!(
            event_name = "client.policy.created",
            policy_id = created.id.as_deref().unwrap_or("<unassigned>"),
            rule_groups = payload.rules.len(),
            "approval policy created"
        );
        Ok(created)
    }

    async fn list_policies(&self) -> Result<Vec<PolicyRecord>, BackendError> {
        let endpoint = self.config.endpoint(LIST_PATH);
        let body = self.send(self.client.get(&endpoint), &endpoint).await?;
        decode_body(&body)
    }

    async fn policy_details(&self, policy_id: &str) -> Result<PolicyRecord, BackendError> {
        let endpoint = self.config.endpoint(&format!("{DETAILS_PATH}/{}", policy_id.trim()));
        let body = self.send(self.client.get(&endpoint), &endpoint).await?;
        decode_body(&body)
    }
}

/// Decodes a success body, accepting both bare payloads and `{ "data": ... }` envelopes.
fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, BackendError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|error| BackendError::Decode { message: error.to_string() })?;
    serde_json::from_value(unwrap_envelope(value))
        .map_err(|error| BackendError::Decode { message: error.to_string() })
}

fn decode_created(body: &str) -> Result<CreatedPolicy, BackendError> {
    if body.trim().is_empty() {
        return Ok(CreatedPolicy::default());
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|error| BackendError::Decode { message: error.to_string() })?;
    let message = value.get("message").and_then(Value::as_str).map(str::to_string);
    let mut created: CreatedPolicy = match unwrap_envelope(value) {
        inner @ Value::Object(_) => serde_json::from_value(inner)
            .map_err(|error| BackendError::Decode { message: error.to_string() })?,
        Value::String(id) => CreatedPolicy { id: Some(id), message: None },
        _ => CreatedPolicy::default(),
    };
    if created.message.is_none() {
        created.message = message;
    }
    Ok(created)
}

fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Pulls a user-facing message out of an error body (`message` or `error`, string or nested).
fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .into_iter()
        .filter_map(|key| value.get(key))
        .find_map(|candidate| match candidate {
            Value::String(text) => Some(text.clone()),
            Value::Object(_) => {
                candidate.get("message").and_then(Value::as_str).map(str::to_string)
            }
            _ => None,
        })
        .filter(|message| !message.trim().is_empty())
}
