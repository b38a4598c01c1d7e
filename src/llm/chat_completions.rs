//! OpenAI Chat Completions API driver.
//!
//! Lets the orchestrator run against any OpenAI-compatible endpoint
//! (`/v1/chat/completions`). Requests are non-streaming; tool calls come back
//! in `choices[0].message.tool_calls`.

use serde_json::{Value, json};

use crate::error::LlmError;

use super::{
    FunctionDeclaration, LlmDriver, LlmRequest, LlmResponse, LlmSettings, ParamType,
    ToolCallInvocation, TurnRole,
};

/// Driver for the OpenAI Chat Completions API.
#[derive(Clone)]
pub struct ChatCompletionsDriver {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for ChatCompletionsDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsDriver")
            .field("settings", &self.settings)
            .finish()
    }
}

impl ChatCompletionsDriver {
    /// Create a new Chat Completions driver with the given settings.
    #[must_use]
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            http: super::http_client(settings.timeout),
            settings,
        }
    }
}

#[async_trait::async_trait]
impl LlmDriver for ChatCompletionsDriver {
    async fn generate(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(LlmError::MissingCredential)?;

        let url = format!(
            "{}/v1/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );
        let body = request_body(&self.settings.model, &req);

        let resp = self
            .http
            .post(&url)
            .timeout(self.settings.timeout)
            .bearer_auth(api_key)
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
        parse_response(&raw)
    }
}

pub fn request_body(model: &str, req: &LlmRequest) -> Value {
    let mut messages = vec![json!({ "role": "system", "content": req.system_instruction })];
    messages.extend(req.history.iter().map(|turn| {
        let role = match turn.role {
            TurnRole::User => "user",
            TurnRole::Model => "assistant",
        };
        json!({ "role": role, "content": turn.text })
    }));
    messages.push(json!({ "role": "user", "content": req.prompt }));

    let mut body = json!({
        "model": model,
        "messages": messages,
        "temperature": req.temperature,
    });
    if !req.tools.is_empty() {
        body["tools"] = Value::Array(req.tools.iter().map(tool_json).collect());
    }
    body
}

fn tool_json(decl: &FunctionDeclaration) -> Value {
    let properties: serde_json::Map<String, Value> = decl
        .params
        .iter()
        .map(|p| {
            let kind = match p.kind {
                ParamType::String => "string",
            };
            (
                p.name.to_string(),
                json!({ "type": kind, "description": p.description }),
            )
        })
        .collect();

    json!({
        "type": "function",
        "function": {
            "name": decl.name,
            "description": decl.description,
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": decl.required(),
            }
        }
    })
}

/// Extract text and tool calls from a Chat Completions reply.
///
/// Tool calls whose `arguments` string is not a JSON object are dropped.
pub fn parse_response(raw: &Value) -> Result<LlmResponse, LlmError> {
    let message = raw
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| LlmError::Malformed("response has no choices".to_string()))?;

    let text = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let function_calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| {
            calls
                .iter()
                .filter_map(|tc| {
                    let function = tc.get("function")?;
                    let name = function.get("name")?.as_str()?.to_string();
                    let args = function.get("arguments").and_then(Value::as_str).unwrap_or("{}");
                    match serde_json::from_str::<Value>(args) {
                        Ok(Value::Object(args)) => Some(ToolCallInvocation { name, args }),
                        _ => {
                            tracing::warn!(tool_name = %name, "Dropping tool call with unparseable arguments");
                            None
                        }
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(LlmResponse {
        text,
        function_calls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::HistoryTurn;
    use crate::llm::prompt::router_tool_declaration;

    #[test]
    fn test_request_body_maps_roles_and_tools() {
        let req = LlmRequest {
            system_instruction: "sys".to_string(),
            history: vec![HistoryTurn::user("a"), HistoryTurn::model("b")],
            prompt: "c".to_string(),
            tools: vec![router_tool_declaration()],
            temperature: 0.7,
            thinking_budget: Some(2048),
        };
        let body = request_body("gpt-4o", &req);

        let roles: Vec<_> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
        assert_eq!(body["tools"][0]["function"]["name"], "execute_mcp_tool");
        assert_eq!(body["tools"][0]["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_parse_tool_calls() {
        let raw = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {
                            "id": "call_1",
                            "type": "function",
                            "function": {
                                "name": "execute_mcp_tool",
                                "arguments": "{\"serverName\":\"Linear Issues\",\"toolName\":\"createIssue\",\"arguments\":\"{}\"}"
                            }
                        },
                        {
                            "id": "call_2",
                            "type": "function",
                            "function": { "name": "execute_mcp_tool", "arguments": "not json" }
                        }
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        });

        let resp = parse_response(&raw).unwrap();
        assert!(resp.text.is_empty());
        assert_eq!(resp.function_calls.len(), 1);
        assert_eq!(resp.function_calls[0].args["serverName"], "Linear Issues");
    }

    #[test]
    fn test_parse_missing_choices() {
        assert!(matches!(
            parse_response(&json!({})),
            Err(LlmError::Malformed(_))
        ));
    }
}
