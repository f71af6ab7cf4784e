use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use super::provider::LlmProvider;
use super::types::{AssistantTurn, ChatRequest, ToolCall};

/// Client for any OpenAI-compatible `/v1` endpoint.
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(base_url: String, api_key: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(30)))
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            client,
        })
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn post_json(&self, path: &str, body: &Value, what: &str) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .authorize(self.client.post(&url))
            .json(body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ApiError::Timeout(format!("{} request to {}", what, url))
                } else {
                    ApiError::ServiceUnavailable(format!("{} request failed: {}", what, err))
                }
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "OpenAI {} error ({}): {}",
                what, status, text
            )));
        }

        res.json().await.map_err(ApiError::internal)
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: ChatRequest, model_id: &str) -> Result<AssistantTurn, ApiError> {
        let body = build_chat_body(&request, model_id);
        let payload = self.post_json("/v1/chat/completions", &body, "chat").await?;
        parse_completion(&payload)
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": model_id,
            "input": inputs,
        });
        let payload = self.post_json("/v1/embeddings", &body, "embed").await?;
        let embeddings = parse_embeddings(&payload);

        if embeddings.len() != inputs.len() {
            return Err(ApiError::Internal(format!(
                "Embedding count mismatch: sent {}, received {}",
                inputs.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }
}

fn build_chat_body(request: &ChatRequest, model_id: &str) -> Value {
    let mut body = json!({
        "model": model_id,
        "messages": request.messages,
        "stream": false,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(temperature) = request.temperature {
            obj.insert("temperature".to_string(), json!(temperature));
        }
        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect();
            obj.insert("tools".to_string(), Value::Array(tools));
            obj.insert("tool_choice".to_string(), json!("auto"));
        }
    }

    body
}

fn parse_completion(payload: &Value) -> Result<AssistantTurn, ApiError> {
    let message = payload
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| ApiError::Internal("Chat response has no choices".to_string()))?;

    let tool_calls: Vec<ToolCall> = message
        .get("tool_calls")
        .and_then(|v| v.as_array())
        .map(|calls| {
            calls
                .iter()
                .filter_map(|call| {
                    let function = call.get("function")?;
                    let name = function.get("name")?.as_str()?.to_string();
                    let arguments = match function.get("arguments") {
                        Some(Value::String(raw)) => raw.clone(),
                        Some(other) => other.to_string(),
                        None => "{}".to_string(),
                    };
                    let id = call
                        .get("id")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string();
                    Some(ToolCall { id, name, arguments })
                })
                .collect()
        })
        .unwrap_or_default();

    if !tool_calls.is_empty() {
        return Ok(AssistantTurn::ToolCalls(tool_calls));
    }

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Ok(AssistantTurn::Final(content))
}

fn parse_embeddings(payload: &Value) -> Vec<Vec<f32>> {
    let mut indexed: Vec<(usize, Vec<f32>)> = Vec::new();
    if let Some(data) = payload["data"].as_array() {
        for (position, item) in data.iter().enumerate() {
            if let Some(vals) = item["embedding"].as_array() {
                let vec: Vec<f32> = vals.iter().filter_map(|v| v.as_f64().map(|f| f as f32)).collect();
                let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(position);
                indexed.push((index, vec));
            }
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, vec)| vec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::{ChatMessage, ToolSpec};

    #[test]
    fn chat_body_includes_tools_only_when_offered() {
        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        let body = build_chat_body(&request, "gpt-4o");
        assert!(body.get("tools").is_none());
        assert_eq!(body["messages"][0]["role"], "user");

        let request = request.with_tools(vec![ToolSpec {
            name: "news_retriever".to_string(),
            description: "news".to_string(),
            parameters: json!({ "type": "object" }),
        }]);
        let body = build_chat_body(&request, "gpt-4o");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "news_retriever");
        assert_eq!(body["tool_choice"], "auto");
    }

    #[test]
    fn tool_calls_take_precedence_over_content() {
        let payload = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "news_retriever",
                            "arguments": "{\"query\":\"1.6590078\"}"
                        }
                    }]
                }
            }]
        });

        let turn = parse_completion(&payload).unwrap();
        assert_eq!(
            turn,
            AssistantTurn::ToolCalls(vec![ToolCall {
                id: "call_1".to_string(),
                name: "news_retriever".to_string(),
                arguments: "{\"query\":\"1.6590078\"}".to_string(),
            }])
        );
    }

    #[test]
    fn plain_content_is_final_answer() {
        let payload = json!({
            "choices": [{ "message": { "role": "assistant", "content": "Done." } }]
        });
        assert_eq!(
            parse_completion(&payload).unwrap(),
            AssistantTurn::Final("Done.".to_string())
        );

        assert!(parse_completion(&json!({ "choices": [] })).is_err());
    }

    #[test]
    fn embeddings_are_ordered_by_index() {
        let payload = json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        });
        let embeddings = parse_embeddings(&payload);
        assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_openai_connection() {
        let Ok(key) = std::env::var("OPENAI_API_KEY") else {
            return;
        };
        let provider = OpenAiProvider::new(
            "https://api.openai.com".to_string(),
            Some(key),
            Duration::from_secs(30),
        )
        .unwrap();

        let turn = provider
            .complete(ChatRequest::new(vec![ChatMessage::user("Hello")]), "gpt-4o-mini")
            .await;
        match turn {
            Ok(turn) => println!("OpenAI response: {:?}", turn),
            Err(e) => panic!("Failed to reach OpenAI: {}", e),
        }
    }
}
