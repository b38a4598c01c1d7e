//! Gemini `generateContent` driver.
//!
//! Sends one non-streaming request per turn to
//! `/v1beta/models/{model}:generateContent` and collects text and
//! `functionCall` parts from the first candidate.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::LlmError;

use super::{
    FunctionDeclaration, LlmDriver, LlmRequest, LlmResponse, LlmSettings, ParamType,
    ToolCallInvocation, TurnRole,
};

/// Driver for the Gemini REST API.
#[derive(Clone)]
pub struct GeminiDriver {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for GeminiDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiDriver")
            .field("settings", &self.settings)
            .finish()
    }
}

impl GeminiDriver {
    /// Create a new Gemini driver with the given settings.
    #[must_use]
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            http: super::http_client(settings.timeout),
            settings,
        }
    }

    fn endpoint(&self) -> Result<url::Url, LlmError> {
        let base = url::Url::parse(&format!(
            "{}/",
            self.settings.base_url.trim_end_matches('/')
        ))?;
        Ok(base.join(&format!(
            "v1beta/models/{}:generateContent",
            self.settings.model
        ))?)
    }
}

#[async_trait::async_trait]
impl LlmDriver for GeminiDriver {
    async fn generate(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(LlmError::MissingCredential)?;

        let url = self.endpoint()?;
        let body = request_body(&req);

        tracing::debug!(
            url = %url,
            model = %self.settings.model,
            history_len = req.history.len(),
            "Sending generateContent request"
        );

        let resp = self
            .http
            .post(url)
            .timeout(self.settings.timeout)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let raw: Value = resp.json().await?;
        parse_response(raw)
    }
}

/// Build the `generateContent` JSON body.
pub fn request_body(req: &LlmRequest) -> Value {
    let mut contents: Vec<Value> = req
        .history
        .iter()
        .map(|turn| {
            let role = match turn.role {
                TurnRole::User => "user",
                TurnRole::Model => "model",
            };
            json!({ "role": role, "parts": [{ "text": turn.text }] })
        })
        .collect();
    contents.push(json!({ "role": "user", "parts": [{ "text": req.prompt }] }));

    let mut generation_config = json!({ "temperature": req.temperature });
    if let Some(budget) = req.thinking_budget {
        generation_config["thinkingConfig"] = json!({ "thinkingBudget": budget });
    }

    let mut body = json!({
        "systemInstruction": { "parts": [{ "text": req.system_instruction }] },
        "contents": contents,
        "generationConfig": generation_config,
    });

    if !req.tools.is_empty() {
        let declarations: Vec<Value> = req.tools.iter().map(function_declaration).collect();
        body["tools"] = json!([{ "functionDeclarations": declarations }]);
    }

    body
}

fn function_declaration(decl: &FunctionDeclaration) -> Value {
    let properties: serde_json::Map<String, Value> = decl
        .params
        .iter()
        .map(|p| {
            let kind = match p.kind {
                ParamType::String => "STRING",
            };
            (
                p.name.to_string(),
                json!({ "type": kind, "description": p.description }),
            )
        })
        .collect();

    json!({
        "name": decl.name,
        "description": decl.description,
        "parameters": {
            "type": "OBJECT",
            "properties": properties,
            "required": decl.required(),
        }
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: Option<bool>,
    #[serde(default)]
    function_call: Option<Value>,
}

/// Convert one `functionCall` part, or `None` when its shape is unusable.
fn function_call(raw: Value) -> Option<ToolCallInvocation> {
    let Value::Object(mut call) = raw else {
        return None;
    };
    let Some(Value::String(name)) = call.remove("name") else {
        return None;
    };
    let args = match call.remove("args") {
        None | Some(Value::Null) => serde_json::Map::new(),
        Some(Value::Object(args)) => args,
        Some(_) => return None,
    };
    Some(ToolCallInvocation { name, args })
}

/// Extract text and function calls from a `generateContent` reply.
///
/// Text parts are concatenated in order; thought summaries are skipped.
/// Function-call parts without a string name or with non-object args are
/// dropped; the rest of the reply is kept.
pub fn parse_response(raw: Value) -> Result<LlmResponse, LlmError> {
    if let Some(err) = raw.get("error") {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(LlmError::Malformed(message.to_string()));
    }

    let parsed: GenerateContentResponse = serde_json::from_value(raw)?;
    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Malformed("response has no candidates".to_string()))?;

    let mut out = LlmResponse::default();
    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if let Some(text) = part.text {
            if part.thought != Some(true) {
                out.text.push_str(&text);
            }
        }
        if let Some(raw) = part.function_call {
            match function_call(raw) {
                Some(call) => out.function_calls.push(call),
                None => tracing::warn!("Dropping malformed function call"),
            }
        }
    }

    Ok(out)
}
