//! Gemini API client for journaling conversations and daily summaries.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::journal::analysis::parse_summary_reply;
use crate::journal::gateway::{ModelError, ModelGateway, Summary};
use crate::journal::prompts;
use crate::journal::session::{Role, Session, Turn};
use crate::journal::user_key::UserKey;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
];

pub struct GeminiClient {
    api_key: String,
    model: String,
    timezone: Tz,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    message: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

fn content(role: Option<&'static str>, parts: &[String]) -> Content {
    Content {
        role,
        parts: parts.iter().map(|text| Part { text: text.clone() }).collect(),
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "model",
    }
}

/// Pull the first text part out of a response body.
fn extract_text(body: &str) -> Result<String, ModelError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| ModelError::Decode(format!("Failed to parse response: {e}")))?;

    if let Some(error) = parsed.error {
        return Err(ModelError::Api(error.message));
    }
    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ModelError::Api(format!("prompt blocked: {reason}")));
    }

    let candidates = parsed.candidates.ok_or(ModelError::Empty)?;
    let candidate = candidates.into_iter().next().ok_or(ModelError::Empty)?;
    let finish = candidate.finish_reason;
    let text = candidate
        .content
        .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
        .ok_or_else(|| match finish {
            Some(reason) if reason != "STOP" => ModelError::Api(format!("no text, finish reason {reason}")),
            _ => ModelError::Decode("unexpected part type".to_string()),
        })?;

    Ok(text)
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, timezone: Tz) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ModelError::Http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { api_key, model, timezone, client })
    }

    fn request(&self, system_instruction: Option<Content>, contents: Vec<Content>) -> GenerateRequest {
        GenerateRequest {
            system_instruction,
            contents,
            generation_config: GenerationConfig {
                temperature: 1.0,
                top_p: 0.95,
                top_k: 1,
                max_output_tokens: 1024,
            },
            safety_settings: HARM_CATEGORIES
                .into_iter()
                .map(|category| SafetySetting { category, threshold: "BLOCK_ONLY_HIGH" })
                .collect(),
        }
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, ModelError> {
        let url = format!("{}/{}:generateContent?key={}", GEMINI_API_BASE, self.model, self.api_key);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ModelError::Http(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ModelError::Http(format!("Failed to read response: {}", e.without_url())))?;

        debug!("Gemini response status: {status}");

        if !status.is_success() {
            return Err(ModelError::Api(format!("{status}: {body}")));
        }

        extract_text(&body)
    }
}

#[async_trait]
impl ModelGateway for GeminiClient {
    async fn start_conversation(&self, key: &UserKey, seed: Vec<String>) -> Result<Session, ModelError> {
        let today = Utc::now().with_timezone(&self.timezone).date_naive();
        Ok(Session::seeded(key.clone(), prompts::system_instruction(today), seed))
    }

    async fn send_turn(&self, session: &Session, text: &str) -> Result<String, ModelError> {
        // Held across the call so turns for one user stay ordered
        let mut turns = session.turns().await;

        let mut contents: Vec<Content> = turns
            .iter()
            .map(|t| content(Some(role_name(t.role)), &t.parts))
            .collect();
        contents.push(content(Some("user"), &[text.to_string()]));

        let request = self.request(Some(content(None, session.instruction())), contents);
        let reply = self.generate(&request).await?;

        turns.push(Turn::user(text));
        turns.push(Turn::model(reply.clone()));
        Ok(reply)
    }

    async fn summarize(&self, session: &Session) -> Result<Summary, ModelError> {
        let turns = session.snapshot().await;
        let history = serde_json::to_string(&turns)
            .map_err(|e| ModelError::Decode(format!("Failed to serialize session: {e}")))?;

        info!("Summarizing session for {} ({} turns)", session.key(), turns.len());
        let request = self.request(None, vec![content(Some("user"), &prompts::summary_prompt(&history))]);
        let text = self.generate(&request).await?;

        let (summary, mood) = parse_summary_reply(&text).map_err(|e| {
            warn!("Unexpected summary reply: {}", text.chars().take(200).collect::<String>());
            ModelError::Decode(e)
        })?;
        Ok(Summary { summary, mood })
    }
}
