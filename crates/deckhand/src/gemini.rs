//! Blocking client for the Gemini `generateContent` endpoint.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::chat::{ChatCompleter, ChatMessage, Role};
use crate::config::Config;
use crate::error::{GenerationError, ServiceError};
use crate::imagegen::{ImageGenerator, ImageRequest, InlineImage};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part::Text {
                text: text.to_string(),
            }],
        }
    }
}

/// Untagged union of content parts. Variant order matters for decoding;
/// anything unrecognised lands in `Other`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    image_config: ImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    fn parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    pub fn images(&self) -> Vec<InlineImage> {
        self.parts()
            .iter()
            .filter_map(|part| match part {
                Part::InlineData { inline_data } => Some(InlineImage {
                    mime_type: inline_data.mime_type.clone(),
                    data: inline_data.data.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn text(&self) -> String {
        self.parts()
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Map a failed call onto the collaborator taxonomy.
///
/// HTTP 429, or any message mentioning `429` or `RESOURCE_EXHAUSTED`, is a
/// rate limit.
pub fn classify(status: Option<u16>, message: &str) -> ServiceError {
    if status == Some(429) || message.contains("429") || message.contains("RESOURCE_EXHAUSTED") {
        ServiceError::RateLimited(message.to_string())
    } else {
        ServiceError::Failed(message.to_string())
    }
}

fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.status.is_empty() => format!(
            "{} ({status} {})",
            envelope.error.message, envelope.error.status
        ),
        Ok(envelope) => format!("{} ({status})", envelope.error.message),
        Err(_) => format!("HTTP {status}: {}", body.trim()),
    }
}

/// Build the chat `contents` array. Gemini expects the conversation to open
/// with a user turn, so leading model messages (the greeting) are dropped.
fn chat_contents(history: &[ChatMessage]) -> Vec<Content> {
    history
        .iter()
        .skip_while(|m| m.role == Role::Model)
        .map(|m| {
            let role = match m.role {
                Role::User => "user",
                Role::Model => "model",
            };
            Content::text(Some(role), &m.text)
        })
        .collect()
}

pub struct GeminiClient {
    agent: ureq::Agent,
    api_key: String,
    image_model: String,
    chat_model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, image_model: &str, chat_model: &str) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(TIMEOUT))
            .build()
            .into();
        Self {
            agent,
            api_key,
            image_model: image_model.to_string(),
            chat_model: chat_model.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, GenerationError> {
        let api_key = config
            .resolve_api_key()
            .ok_or(GenerationError::MissingApiKey)?;
        Ok(Self::new(api_key, config.image_model(), config.chat_model()))
    }

    fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ServiceError> {
        let url = format!("{BASE_URL}/{model}:generateContent");
        log::debug!("POST {url}");

        let mut response = self
            .agent
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .send_json(request)
            .map_err(|e| classify(None, &format!("Failed to call Gemini API: {e}")))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(classify(Some(status), &error_message(status, &body)));
        }

        response
            .body_mut()
            .read_json::<GenerateContentResponse>()
            .map_err(|e| ServiceError::Failed(format!("Failed to parse Gemini response: {e}")))
    }
}

impl ImageGenerator for GeminiClient {
    fn generate(&self, request: &ImageRequest) -> Result<Vec<InlineImage>, ServiceError> {
        let body = image_request(request);
        let response = self.generate_content(&self.image_model, &body)?;
        Ok(response.images())
    }
}

impl ChatCompleter for GeminiClient {
    fn complete(&self, system_prompt: &str, history: &[ChatMessage]) -> Result<String, ServiceError> {
        let body = GenerateContentRequest {
            contents: chat_contents(history),
            system_instruction: Some(Content::text(None, system_prompt)),
            generation_config: None,
        };
        let response = self.generate_content(&self.chat_model, &body)?;
        Ok(response.text())
    }
}

fn image_request(request: &ImageRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::text(None, &request.prompt)],
        system_instruction: None,
        generation_config: Some(GenerationConfig {
            image_config: ImageConfig {
                aspect_ratio: request.aspect_ratio.clone(),
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_request_shape() {
        let body = image_request(&ImageRequest {
            prompt: "a photo".to_string(),
            aspect_ratio: "1:1".to_string(),
        });
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "a photo");
        assert_eq!(json["generationConfig"]["imageConfig"]["aspectRatio"], "1:1");
        assert!(json.get("systemInstruction").is_none());
        assert!(json["contents"][0].get("role").is_none());
    }

    #[test]
    fn test_response_images_in_order() {
        let raw = r#"{
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "Here you go"},
                        {"inlineData": {"mimeType": "image/png", "data": "AAAA"}},
                        {"inlineData": {"mimeType": "image/jpeg", "data": "BBBB"}}
                    ]
                }
            }]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let images = response.images();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].data_uri(), "data:image/png;base64,AAAA");
        assert_eq!(response.text(), "Here you go");
    }

    #[test]
    fn test_response_without_candidates() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(response.images().is_empty());
        assert_eq!(response.text(), "");
    }

    #[test]
    fn test_unknown_parts_are_tolerated() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"thoughtSignature":"x"},{"text":"hi"}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.text(), "hi");
    }

    #[test]
    fn test_classify_rate_limits() {
        assert!(classify(Some(429), "Too Many Requests").is_rate_limited());
        assert!(classify(None, "got 429 from upstream").is_rate_limited());
        assert!(classify(Some(400), "RESOURCE_EXHAUSTED").is_rate_limited());
        assert_eq!(
            classify(Some(500), "internal"),
            ServiceError::Failed("internal".to_string())
        );
    }

    #[test]
    fn test_error_message_from_envelope() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let message = error_message(429, body);
        assert_eq!(message, "Quota exceeded (429 RESOURCE_EXHAUSTED)");
        assert_eq!(error_message(502, "bad gateway\n"), "HTTP 502: bad gateway");
    }

    #[test]
    fn test_chat_contents_skip_leading_greeting() {
        let history = vec![
            ChatMessage::model("Hello!"),
            ChatMessage::user("What is PAYGo?"),
            ChatMessage::model("Pay as you go."),
            ChatMessage::user("Thanks"),
        ];
        let contents = chat_contents(&history);
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0].role.as_deref(), Some("user"));
        assert_eq!(contents[1].role.as_deref(), Some("model"));
    }

    #[test]
    fn test_from_config_uses_configured_models() {
        let mut config = Config::default();
        config.set("image_generation.api_key", "k").unwrap();
        config.set("chat.model", "chat-x").unwrap();
        let client = GeminiClient::from_config(&config).unwrap();
        assert_eq!(client.chat_model, "chat-x");
        assert_eq!(client.image_model, crate::config::DEFAULT_IMAGE_MODEL);
    }
}
