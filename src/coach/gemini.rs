//! Gemini `generateContent` client

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{Coach, GeneratedPlan, PlannedExercise, parse_exercise, parse_plan, parse_tip, prompt};
use crate::error::CoachError;
use crate::model::{ExerciseLog, PlanType, UserProfile, WorkoutSession};

type Result<T> = std::result::Result<T, CoachError>;

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// Text of the first candidate; empty candidates count as malformed
fn candidate_text(response: GenerateResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(CoachError::Malformed("response has no candidate text".into()));
    }
    Ok(text)
}

/// Client for the Gemini REST API
pub struct GeminiCoach {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiCoach {
    pub fn new(api_key: String, model: String, base_url: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(CoachError::NotConfigured);
        }
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
        })
    }

    fn request_body(prompt: &str, schema: Option<Value>) -> Value {
        let mut config = json!({ "temperature": 0.7 });
        if let Some(schema) = schema {
            config["responseMimeType"] = json!("application/json");
            config["responseSchema"] = schema;
        }
        json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": config,
        })
    }

    async fn generate(&self, prompt: &str, schema: Option<Value>) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        info!(model = %self.model, prompt_chars = prompt.len(), json = schema.is_some(), "sending AI request");

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(prompt, schema))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "AI request rejected");
            return Err(CoachError::Api { status: status.as_u16(), body });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| CoachError::Malformed(format!("unexpected envelope: {e}")))?;
        candidate_text(body)
    }
}

impl Coach for GeminiCoach {
    async fn generate_plan(
        &self,
        profile: &UserProfile,
        history: &[WorkoutSession],
        plan: PlanType,
    ) -> Result<GeneratedPlan> {
        let text = self
            .generate(&prompt::plan_prompt(profile, history, plan), Some(prompt::plan_schema()))
            .await?;
        parse_plan(&text)
    }

    async fn swap_exercise(&self, profile: &UserProfile, current: &ExerciseLog) -> Result<PlannedExercise> {
        let text = self
            .generate(&prompt::swap_prompt(profile, current), Some(prompt::exercise_schema()))
            .await?;
        parse_exercise(&text)
    }

    async fn coaching_tip(&self, profile: &UserProfile, exercise: &str) -> Result<String> {
        let text = self.generate(&prompt::tip_prompt(profile, exercise), None).await?;
        parse_tip(&text)
    }
}
