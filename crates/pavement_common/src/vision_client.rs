//! Vision Client Abstraction
//!
//! One blocking call: model id + prompt + image -> raw response text.
//! The real client speaks the Gemini `generateContent` REST API; the fake
//! client replays scripted outcomes for tests.

use crate::image_payload::ImagePayload;
use anyhow::Result;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Vision call errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum VisionError {
    #[error("No API key configured")]
    MissingCredential,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Model {model} returned HTTP {status}: {body}")]
    Status {
        model: String,
        status: u16,
        body: String,
    },

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Model returned empty response")]
    EmptyResponse,
}

/// Generic vision model client
pub trait VisionClient: Send + Sync {
    /// Ask `model` about `image`, returning the model's text answer
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: &ImagePayload,
    ) -> Result<String, VisionError>;
}

impl<T: VisionClient + ?Sized> VisionClient for Arc<T> {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: &ImagePayload,
    ) -> Result<String, VisionError> {
        (**self).generate(model, prompt, image)
    }
}

/// Gemini REST client
pub struct GeminiVisionClient {
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
    client: reqwest::blocking::Client,
}

impl GeminiVisionClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout_secs,
            client,
        })
    }

    fn url_for(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, model)
    }
}

impl VisionClient for GeminiVisionClient {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: &ImagePayload,
    ) -> Result<String, VisionError> {
        if self.api_key.is_empty() {
            return Err(VisionError::MissingCredential);
        }

        let request_body = generate_content_body(prompt, image);
        debug!(
            "POST {} ({} image bytes, {})",
            self.url_for(model),
            image.len(),
            image.mime_type()
        );

        let response = self
            .client
            .post(self.url_for(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    VisionError::Timeout(self.timeout_secs)
                } else {
                    VisionError::Http(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(VisionError::Status {
                model: model.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let response_json: Value = response
            .json()
            .map_err(|e| VisionError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        extract_response_text(&response_json)
    }
}

/// Request body: text prompt followed by the inline image
pub fn generate_content_body(prompt: &str, image: &ImagePayload) -> Value {
    serde_json::json!({
        "contents": [{
            "parts": [
                {"text": prompt},
                {"inline_data": {
                    "mime_type": image.mime_type(),
                    "data": image.base64_data(),
                }},
            ]
        }]
    })
}

/// Concatenate the text parts of the first candidate
pub fn extract_response_text(response: &Value) -> Result<String, VisionError> {
    let parts = response
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or(VisionError::EmptyResponse)?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.trim().is_empty() {
        Err(VisionError::EmptyResponse)
    } else {
        Ok(text)
    }
}

/// Fake vision client for testing
pub struct FakeVisionClient {
    responses: Mutex<Vec<Result<String, VisionError>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeVisionClient {
    /// Create a fake client with pre-defined responses, consumed in order.
    /// The last response repeats once the others are used up.
    pub fn new(responses: Vec<Result<String, VisionError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always_text(text: impl Into<String>) -> Self {
        Self::new(vec![Ok(text.into())])
    }

    pub fn always_error(error: VisionError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Model ids this client was asked for, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

impl VisionClient for FakeVisionClient {
    fn generate(
        &self,
        model: &str,
        _prompt: &str,
        _image: &ImagePayload,
    ) -> Result<String, VisionError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(model.to_string());
        }

        let mut responses = self
            .responses
            .lock()
            .map_err(|_| VisionError::Http("fake client poisoned".to_string()))?;
        match responses.len() {
            0 => Err(VisionError::EmptyResponse),
            1 => responses[0].clone(),
            _ => responses.remove(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_payload::tiny_png;

    fn payload() -> ImagePayload {
        ImagePayload::from_bytes("road.png", tiny_png()).unwrap()
    }

    #[test]
    fn test_extract_response_text_joins_parts() {
        let response = serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "{\"overall_condition\":"}, {"text": " \"good\"}"}]}
            }]
        });
        let text = extract_response_text(&response).unwrap();
        assert_eq!(text, "{\"overall_condition\": \"good\"}");
    }

    #[test]
    fn test_extract_response_text_empty() {
        let response = serde_json::json!({"candidates": []});
        assert!(matches!(
            extract_response_text(&response),
            Err(VisionError::EmptyResponse)
        ));

        let response = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "  "}]}}]
        });
        assert!(matches!(
            extract_response_text(&response),
            Err(VisionError::EmptyResponse)
        ));
    }

    #[test]
    fn test_generate_content_body_shape() {
        let image = payload();
        let body = generate_content_body("assess", &image);
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "assess");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(parts[1]["inline_data"]["data"], image.base64_data());
    }

    #[test]
    fn test_gemini_client_url() {
        let client = GeminiVisionClient::new("https://example.test/", "key", 5).unwrap();
        assert_eq!(
            client.url_for("gemini-2.5-flash"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_gemini_client_without_key_makes_no_request() {
        let client = GeminiVisionClient::new("http://127.0.0.1:9", "", 1).unwrap();
        let result = client.generate("gemini-pro", "assess", &payload());
        assert!(matches!(result, Err(VisionError::MissingCredential)));
    }

    #[test]
    fn test_fake_client_sequence() {
        let client = FakeVisionClient::new(vec![
            Err(VisionError::Timeout(30)),
            Ok("first".to_string()),
            Ok("last".to_string()),
        ]);
        let image = payload();

        assert!(client.generate("a", "", &image).is_err());
        assert_eq!(client.generate("b", "", &image).unwrap(), "first");
        assert_eq!(client.generate("c", "", &image).unwrap(), "last");
        assert_eq!(client.generate("d", "", &image).unwrap(), "last");
        assert_eq!(client.calls(), vec!["a", "b", "c", "d"]);
    }
}
