//! Instruction checker backed by an Ollama-compatible `/api/chat` endpoint.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_lsp::async_trait;

use crate::validation::{InstructionChecker, InstructionFailure};

const SYSTEM_PROMPT: &str = "You are a technical editor who evaluates instructions against sections of a document. Strictly evaluate if the supplied content follows the specified instruction. Output your results as JSON.";

#[derive(Debug, Clone)]
pub struct OllamaChecker {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    format: Value,
    options: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum Verdict {
    Pass,
    Fail,
}

/// The model's answer, shaped by `assessment_schema`
#[derive(Debug, Deserialize)]
struct Assessment {
    assessment: Verdict,
    #[serde(default)]
    explanation: Option<String>,
}

impl OllamaChecker {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.endpoint)
    }

    fn request<'a>(&'a self, content: &str, instruction: &str) -> ChatRequest<'a> {
        let user = json!({ "instruction": instruction, "content": content });
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            stream: false,
            format: assessment_schema(),
            options: json!({ "temperature": 0 }),
        }
    }
}

/// JSON schema the model output is constrained to
fn assessment_schema() -> Value {
    json!({
        "type": "object",
        "required": ["assessment"],
        "properties": {
            "assessment": {
                "description": "The result of the evaluation",
                "type": "string",
                "enum": ["pass", "fail"]
            },
            "explanation": {
                "description": "Suggestions for improvement, if any.",
                "type": "string",
                "maxLength": 500
            }
        }
    })
}

/// Turn the assistant message into a verdict
fn parse_reply(reply: &str) -> Result<Option<InstructionFailure>> {
    let assessment: Assessment = serde_json::from_str(reply.trim())
        .with_context(|| format!("Unexpected instruction checker reply: {}", reply))?;
    match assessment.assessment {
        Verdict::Pass => Ok(None),
        Verdict::Fail => Ok(Some(InstructionFailure {
            explanation: assessment.explanation.unwrap_or_default(),
        })),
    }
}

#[async_trait]
impl InstructionChecker for OllamaChecker {
    async fn check(&self, content: &str, instruction: &str) -> Result<Option<InstructionFailure>> {
        log::debug!("Checking instruction \"{}\" with {}", instruction, self.model);

        let response = self
            .client
            .post(self.chat_url())
            .json(&self.request(content, instruction))
            .send()
            .await
            .with_context(|| format!("Failed to reach instruction checker at {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Instruction checker returned {}: {}", status, body));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .context("Malformed instruction checker response")?;
        parse_reply(&chat.message.content)
    }
}
