//! Client for the hosted generative model.
//!
//! [`AiService`] turns notes and files into prompts and hands them to a
//! [`GenerativeModel`]. [`GeminiClient`] is the HTTP implementation; tests
//! substitute their own model.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{AiFailure, Config, FileItem};

/// One piece of request content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    InlineData(InlineData),
}

/// Binary payload embedded in a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 without any data URL header
    pub data: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub parts: Vec<Part>,
    pub temperature: Option<f32>,
}

/// A model that answers a single request with text.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, AiFailure>;
}

/// Which kind of AI request a result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiTask {
    Summary,
    Analysis,
}

impl AiTask {
    /// Message shown in place of a result when the request failed
    pub fn fallback_message(self) -> &'static str {
        match self {
            AiTask::Summary => "Error connecting to AI service.",
            AiTask::Analysis => "Error analyzing file with AI.",
        }
    }
}

/// Builds prompts and dispatches them to a model with a bounded wait.
#[derive(Clone)]
pub struct AiService {
    model: Arc<dyn GenerativeModel>,
    model_name: String,
    temperature: f32,
    timeout: Duration,
}

impl AiService {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        model_name: impl Into<String>,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        AiService {
            model,
            model_name: model_name.into(),
            temperature,
            timeout,
        }
    }

    /// Service talking to the Gemini endpoint described by `config`
    pub fn from_config(config: &Config) -> Self {
        let client = GeminiClient::new(&config.endpoint, config.api_key.clone());
        AiService::new(
            Arc::new(client),
            &config.model,
            config.temperature,
            config.request_timeout(),
        )
    }

    pub fn summary_request(&self, title: &str, content: &str) -> GenerateRequest {
        let prompt = format!(
            "Please provide a concise, professional 3-sentence summary of the following note titled \"{}\":\n\n{}",
            title, content
        );
        self.request(vec![Part::Text(prompt)])
    }

    /// Images travel inline; other files are described from their name only.
    pub fn analysis_request(&self, file: &FileItem) -> GenerateRequest {
        let mut parts = vec![Part::Text(format!(
            "Explain what is in this file ({}) and provide a short overview.",
            file.name
        ))];

        if file.is_image() {
            match file.base64_payload() {
                "" => warn!("File {} has no base64 payload, sending name only", file.name),
                payload => parts.push(Part::InlineData(InlineData {
                    mime_type: file.mime_type.clone(),
                    data: payload.to_string(),
                })),
            }
        }

        self.request(parts)
    }

    fn request(&self, parts: Vec<Part>) -> GenerateRequest {
        GenerateRequest {
            model: self.model_name.clone(),
            parts,
            temperature: Some(self.temperature),
        }
    }

    pub async fn summarize(&self, title: &str, content: &str) -> Result<String, AiFailure> {
        let request = self.summary_request(title, content);
        self.dispatch(AiTask::Summary, &request).await
    }

    pub async fn analyze(&self, file: &FileItem) -> Result<String, AiFailure> {
        let request = self.analysis_request(file);
        self.dispatch(AiTask::Analysis, &request).await
    }

    async fn dispatch(&self, task: AiTask, request: &GenerateRequest) -> Result<String, AiFailure> {
        debug!("Sending {:?} request to {}", task, request.model);
        let outcome = match tokio::time::timeout(self.timeout, self.model.generate(request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(AiFailure::Timeout {
                secs: self.timeout.as_secs(),
            }),
        };

        match outcome {
            Ok(text) if text.trim().is_empty() => {
                warn!("{:?} request returned no text", task);
                Err(AiFailure::EmptyResponse)
            }
            Ok(text) => Ok(text),
            Err(e) => {
                error!("{:?} request failed: {}", task, e);
                Err(e)
            }
        }
    }
}

/// HTTP client for the Gemini `generateContent` endpoint
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Self {
        GeminiClient {
            http: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    fn url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, model)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, AiFailure> {
        let api_key = self.api_key.as_deref().ok_or(AiFailure::MissingApiKey)?;

        let payload = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: &request.parts,
            }],
            generation_config: request
                .temperature
                .map(|temperature| GenerationConfig { temperature }),
        };

        let response = self
            .http
            .post(self.url(&request.model))
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AiFailure::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AiFailure::from_status(status.as_u16(), text));
        }

        let output: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AiFailure::Network(format!("invalid response body: {}", e)))?;

        output.text().ok_or(AiFailure::EmptyResponse)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: &'a [Part],
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

impl GeminiResponse {
    /// Concatenated text parts of the first candidate
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use tokio::sync::Semaphore;

    use super::*;

    /// Model double that records requests and replies with a fixed outcome.
    pub struct ScriptedModel {
        requests: Mutex<Vec<GenerateRequest>>,
        reply: Result<String, AiFailure>,
        gate: Option<Arc<Semaphore>>,
    }

    impl ScriptedModel {
        pub fn replying(text: &str) -> Self {
            ScriptedModel {
                requests: Mutex::new(Vec::new()),
                reply: Ok(text.to_string()),
                gate: None,
            }
        }

        pub fn failing(failure: AiFailure) -> Self {
            ScriptedModel {
                requests: Mutex::new(Vec::new()),
                reply: Err(failure),
                gate: None,
            }
        }

        /// Each call waits for one permit on `gate` before replying
        pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
            self.gate = Some(gate);
            self
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn last_request(&self) -> Option<GenerateRequest> {
            self.requests.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(&self, request: &GenerateRequest) -> Result<String, AiFailure> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            self.reply.clone()
        }
    }

    pub fn service(model: Arc<ScriptedModel>) -> AiService {
        AiService::new(model, "test-model", 0.7, Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{service, ScriptedModel};
    use super::*;

    #[test]
    fn parts_serialize_to_wire_shape() {
        let parts = vec![
            Part::Text("hi".into()),
            Part::InlineData(InlineData {
                mime_type: "image/png".into(),
                data: "AAAA".into(),
            }),
        ];
        let json = serde_json::to_value(&parts).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"text": "hi"},
                {"inlineData": {"mimeType": "image/png", "data": "AAAA"}}
            ])
        );
    }

    #[test]
    fn summary_prompt_embeds_title_and_content() {
        let ai = service(Arc::new(ScriptedModel::replying("ok")));
        let request = ai.summary_request("Q3 Plan", "Draft budget numbers");

        assert_eq!(request.model, "test-model");
        assert_eq!(request.temperature, Some(0.7));
        match request.parts.as_slice() {
            [Part::Text(prompt)] => {
                assert!(prompt.contains("titled \"Q3 Plan\""));
                assert!(prompt.ends_with("\n\nDraft budget numbers"));
            }
            other => panic!("unexpected parts: {:?}", other),
        }
    }

    #[test]
    fn analysis_attaches_only_images() {
        let ai = service(Arc::new(ScriptedModel::replying("ok")));
        let chart = FileItem::from_bytes(b"png-bytes", "chart.png", "image/png").unwrap();

        let image = ai.analysis_request(&chart);
        assert_eq!(image.parts.len(), 2);
        assert!(matches!(
            &image.parts[1],
            Part::InlineData(InlineData { mime_type, data })
                if mime_type == "image/png" && !data.starts_with("data:")
        ));

        let notes = FileItem::from_bytes(b"hello", "a.txt", "text/plain").unwrap();
        let text = ai.analysis_request(&notes);
        assert_eq!(text.parts.len(), 1);
    }

    #[test]
    fn response_text_joins_first_candidate_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Budget "},{"text":"draft."}]}}]}"#;
        let response: GeminiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.text().as_deref(), Some("Budget draft."));

        let empty: GeminiResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(empty.text(), None);
    }

    #[test]
    fn status_codes_map_to_failure_kinds() {
        assert_eq!(AiFailure::from_status(401, String::new()), AiFailure::Auth { status: 401 });
        assert_eq!(AiFailure::from_status(429, String::new()), AiFailure::Quota { status: 429 });
        assert!(matches!(
            AiFailure::from_status(500, "boom".into()),
            AiFailure::Api { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn blank_reply_is_an_empty_response_failure() {
        let ai = service(Arc::new(ScriptedModel::replying("   ")));
        assert_eq!(ai.summarize("t", "c").await, Err(AiFailure::EmptyResponse));
    }

    #[tokio::test]
    async fn failures_are_passed_through_typed() {
        let model = Arc::new(ScriptedModel::failing(AiFailure::Quota { status: 429 }));
        let ai = service(model.clone());
        assert_eq!(
            ai.analyze(&FileItem::from_bytes(b"hi", "a.txt", "text/plain").unwrap())
                .await,
            Err(AiFailure::Quota { status: 429 })
        );
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_model_times_out() {
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let model = Arc::new(ScriptedModel::replying("late").gated(gate));
        let ai = AiService::new(model, "test-model", 0.7, Duration::from_secs(5));

        assert_eq!(
            ai.summarize("t", "c").await,
            Err(AiFailure::Timeout { secs: 5 })
        );
    }

    #[tokio::test]
    async fn gemini_client_without_key_fails_fast() {
        let client = GeminiClient::new("http://127.0.0.1:9", Some("  ".into()));
        let request = GenerateRequest {
            model: "m".into(),
            parts: vec![Part::Text("hi".into())],
            temperature: None,
        };
        assert_eq!(client.generate(&request).await, Err(AiFailure::MissingApiKey));
    }
}
