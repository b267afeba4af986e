use std::time::Duration;

use anyhow::{Result, anyhow};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    config::AppConfig,
    error::AppError,
    pipeline::GenerationRequest,
};

const MISSING_KEY_MESSAGE: &str = "OpenAI API key not configured";

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    data: Option<Vec<ImageData>>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: Option<String>,
}

#[derive(Clone, Debug)]
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    image_model: String,
    quote_model: String,
}

impl OpenAiClient {
    pub fn new(http: Client, config: &AppConfig) -> Self {
        Self {
            http,
            base_url: config.openai_base_url.clone(),
            api_key: config.openai_api_key.clone(),
            image_model: config.image_model.clone(),
            quote_model: config.quote_model.clone(),
        }
    }

    fn api_key(&self) -> Result<&str, AppError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AppError::Configuration(MISSING_KEY_MESSAGE.to_string()))
    }

    /// Submits a generation job and returns the provider's (temporary) image URL.
    pub async fn generate_image(
        &self,
        request: &GenerationRequest,
        timeout: Duration,
    ) -> Result<String, AppError> {
        let api_key = self.api_key()?;
        let body = json!({
            "model": self.image_model,
            "prompt": request.prompt,
            "n": 1,
            "size": request.size.as_str(),
            "quality": request.quality.as_str(),
            "style": request.style.as_str(),
        });
        debug!(model = %self.image_model, size = request.size.as_str(), "submitting image generation");

        let response = self
            .http
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|err| AppError::Upstream {
                status: None,
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .ok()
                .and_then(|envelope| envelope.error)
                .and_then(|error| error.message)
                .unwrap_or(text);
            warn!(%status, %message, "image provider rejected request");
            return Err(AppError::Upstream {
                status: Some(status.as_u16()),
                message,
            });
        }

        let text = response.text().await.map_err(|err| AppError::Upstream {
            status: None,
            message: err.to_string(),
        })?;
        let payload: ImageGenerationResponse =
            serde_json::from_str(&text).map_err(|err| AppError::Upstream {
                status: None,
                message: format!("Unreadable provider response: {err}"),
            })?;
        payload
            .data
            .and_then(|data| data.into_iter().next())
            .and_then(|image| image.url)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| AppError::Upstream {
                status: None,
                message: "No image URL received from provider".to_string(),
            })
    }

    pub async fn complete_chat(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        temperature: f32,
        timeout: Duration,
    ) -> Result<String> {
        let api_key = self.api_key().map_err(|err| anyhow!(err.to_string()))?;
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .timeout(timeout)
            .json(&json!({
                "model": self.quote_model,
                "messages": [
                    {"role": "system", "content": system},
                    {"role": "user", "content": user}
                ],
                "max_tokens": max_tokens,
                "temperature": temperature,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("chat completion failed: {status} {text}"));
        }
        let payload: ChatCompletionResponse = response.json().await?;
        let content = payload
            .choices
            .and_then(|choices| choices.into_iter().next())
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| anyhow!("provider returned no completion text"))?;
        Ok(content)
    }
}
