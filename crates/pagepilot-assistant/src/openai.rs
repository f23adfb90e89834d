//! OpenAI Assistants (v2) adapter.

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::errors::{ConfigurationError, ProviderError};
use crate::provider::AssistantProvider;
use crate::types::{
    ContentPart, CreateRunRequest, Message, RequiredAction, Role, Run, RunError, RunStatus,
    Thread, ToolCall, ToolDefinition, ToolOutput,
};

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const BETA_HEADER: &str = "OpenAI-Beta";
const BETA_VALUE: &str = "assistants=v2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_LIST_LIMIT: usize = 100;

#[derive(Clone)]
pub struct OpenAiAssistants {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl fmt::Debug for OpenAiAssistants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiAssistants")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl OpenAiAssistants {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigurationError::new("api key must not be empty").into());
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| ConfigurationError::new(format!("http client build failed: {error}")))?;
        let base_url = base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| ConfigurationError::new(format!("{API_KEY_ENV} is not set")))?;
        Self::new(api_key, std::env::var(BASE_URL_ENV).ok())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ProviderError> {
        let response = builder
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_VALUE)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "assistant provider returned an error");
            return Err(ProviderError::http(
                status.as_u16(),
                error_message(&body, status),
            ));
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|error| ProviderError::Decode(error.to_string()))
    }
}

#[async_trait]
impl AssistantProvider for OpenAiAssistants {
    fn name(&self) -> &str {
        "openai"
    }

    async fn create_thread(&self) -> Result<Thread, ProviderError> {
        let thread: WireThread = self
            .send(self.http.post(self.url("threads")).json(&json!({})))
            .await?;
        Ok(Thread { id: thread.id })
    }

    async fn append_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<Message, ProviderError> {
        let body = json!({ "role": "user", "content": content });
        let message: WireMessage = self
            .send(
                self.http
                    .post(self.url(&format!("threads/{thread_id}/messages")))
                    .json(&body),
            )
            .await?;
        Ok(message.into())
    }

    async fn create_run(
        &self,
        thread_id: &str,
        request: CreateRunRequest,
    ) -> Result<Run, ProviderError> {
        let run: WireRun = self
            .send(
                self.http
                    .post(self.url(&format!("threads/{thread_id}/runs")))
                    .json(&create_run_body(&request)),
            )
            .await?;
        Ok(run.into())
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ProviderError> {
        let run: WireRun = self
            .send(
                self.http
                    .get(self.url(&format!("threads/{thread_id}/runs/{run_id}"))),
            )
            .await?;
        Ok(run.into())
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<Run, ProviderError> {
        let tool_outputs: Vec<Value> = outputs
            .iter()
            .map(|output| {
                json!({
                    "tool_call_id": output.tool_call_id,
                    "output": output.wire_output(),
                })
            })
            .collect();
        let run: WireRun = self
            .send(
                self.http
                    .post(self.url(&format!(
                        "threads/{thread_id}/runs/{run_id}/submit_tool_outputs"
                    )))
                    .json(&json!({ "tool_outputs": tool_outputs })),
            )
            .await?;
        Ok(run.into())
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, ProviderError> {
        let limit = limit.clamp(1, MAX_LIST_LIMIT).to_string();
        let page: WireMessageList = self
            .send(
                self.http
                    .get(self.url(&format!("threads/{thread_id}/messages")))
                    .query(&[("order", "desc"), ("limit", limit.as_str())]),
            )
            .await?;
        Ok(page.data.into_iter().map(Message::from).collect())
    }
}

fn create_run_body(request: &CreateRunRequest) -> Value {
    let mut body = json!({ "assistant_id": request.assistant_id });
    if let Some(instructions) = request.instructions.as_deref() {
        body["instructions"] = Value::String(instructions.to_string());
    }
    if let Some(tools) = request.tools.as_deref() {
        body["tools"] = Value::Array(tools.iter().map(function_tool).collect());
    }
    if let Some(metadata) = &request.metadata {
        body["metadata"] = json!(metadata);
    }
    body
}

fn function_tool(definition: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": definition.name,
            "description": definition.description,
            "parameters": definition.parameters,
        }
    })
}

fn error_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<WireErrorBody>(body)
        .ok()
        .map(|body| body.error.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        })
}

#[derive(Deserialize)]
struct WireErrorBody {
    error: WireErrorDetail,
}

#[derive(Deserialize)]
struct WireErrorDetail {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct WireThread {
    id: String,
}

#[derive(Deserialize)]
struct WireRun {
    id: String,
    thread_id: String,
    status: RunStatus,
    #[serde(default)]
    required_action: Option<WireRequiredAction>,
    #[serde(default)]
    last_error: Option<WireRunError>,
}

#[derive(Deserialize)]
struct WireRequiredAction {
    #[serde(default)]
    submit_tool_outputs: Option<WireSubmitToolOutputs>,
}

#[derive(Deserialize)]
struct WireSubmitToolOutputs {
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct WireRunError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct WireMessageList {
    #[serde(default)]
    data: Vec<WireMessage>,
}

#[derive(Deserialize)]
struct WireMessage {
    id: String,
    thread_id: String,
    role: Role,
    #[serde(default)]
    content: Vec<WireContent>,
    #[serde(default)]
    run_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireContent {
    Text { text: WireText },
    ImageFile { image_file: WireImageFile },
    #[serde(other)]
    Unsupported,
}

#[derive(Deserialize)]
struct WireText {
    #[serde(default)]
    value: String,
}

#[derive(Deserialize)]
struct WireImageFile {
    file_id: String,
}

impl From<WireRun> for Run {
    fn from(run: WireRun) -> Self {
        let required_action = run
            .required_action
            .and_then(|action| action.submit_tool_outputs)
            .map(|submit| RequiredAction {
                tool_calls: submit
                    .tool_calls
                    .into_iter()
                    .map(|call| ToolCall::from_raw(call.id, call.function.name, call.function.arguments))
                    .collect(),
            });
        Self {
            id: run.id,
            thread_id: run.thread_id,
            status: run.status,
            required_action,
            last_error: run.last_error.map(|error| RunError {
                code: error.code,
                message: error.message,
            }),
        }
    }
}

impl From<WireMessage> for Message {
    fn from(message: WireMessage) -> Self {
        Self {
            id: message.id,
            thread_id: message.thread_id,
            role: message.role,
            content: message
                .content
                .into_iter()
                .map(|part| match part {
                    WireContent::Text { text } => ContentPart::Text(text.value),
                    WireContent::ImageFile { image_file } => ContentPart::ImageFile {
                        file_id: image_file.file_id,
                    },
                    WireContent::Unsupported => ContentPart::Unsupported,
                })
                .collect(),
            run_id: message.run_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_action_run_decodes_function_calls_with_raw_arguments() {
        let raw = r#"{
            "id": "run_abc",
            "object": "thread.run",
            "thread_id": "thread_xyz",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "postToFacebookPage",
                            "arguments": "{\"message\":\"hello world\"}"
                        }
                    }]
                }
            },
            "last_error": null
        }"#;
        let run: Run = serde_json::from_str::<WireRun>(raw).expect("decode").into();

        assert_eq!(run.status, RunStatus::RequiresAction);
        let calls = run.pending_tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "postToFacebookPage");
        assert_eq!(
            calls[0].raw_arguments.as_deref(),
            Some(r#"{"message":"hello world"}"#)
        );
    }

    #[test]
    fn failed_run_keeps_last_error() {
        let raw = r#"{
            "id": "run_abc",
            "thread_id": "thread_xyz",
            "status": "failed",
            "last_error": { "code": "server_error", "message": "Sorry, something went wrong." }
        }"#;
        let run: Run = serde_json::from_str::<WireRun>(raw).expect("decode").into();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(
            run.last_error.map(|error| error.code),
            Some("server_error".to_string())
        );
    }

    #[test]
    fn message_content_parts_map_unknown_types_to_unsupported() {
        let raw = r#"{
            "id": "msg_1",
            "thread_id": "thread_xyz",
            "role": "assistant",
            "run_id": "run_abc",
            "content": [
                { "type": "text", "text": { "value": "Done!", "annotations": [] } },
                { "type": "image_file", "image_file": { "file_id": "file_1" } },
                { "type": "refusal", "refusal": "no" }
            ]
        }"#;
        let message: Message = serde_json::from_str::<WireMessage>(raw)
            .expect("decode")
            .into();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.run_id.as_deref(), Some("run_abc"));
        assert_eq!(message.content.len(), 3);
        assert_eq!(message.content[2], ContentPart::Unsupported);
        assert_eq!(message.text(), "Done!");
    }

    #[test]
    fn create_run_body_wraps_tools_as_functions() {
        let body = create_run_body(&CreateRunRequest {
            assistant_id: "asst_1".to_string(),
            instructions: None,
            tools: Some(vec![ToolDefinition {
                name: "createTask".to_string(),
                description: "Create a task".to_string(),
                parameters: json!({ "type": "object" }),
            }]),
            metadata: None,
        });
        assert_eq!(body["assistant_id"], "asst_1");
        assert!(body.get("instructions").is_none());
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "createTask");
    }

    #[test]
    fn error_message_prefers_provider_message_then_reason() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(
            error_message(body, StatusCode::UNAUTHORIZED),
            "Incorrect API key provided"
        );
        assert_eq!(
            error_message("<html>", StatusCode::BAD_GATEWAY),
            "Bad Gateway"
        );
    }

    #[test]
    fn new_rejects_blank_key_and_normalizes_base_url() {
        assert!(matches!(
            OpenAiAssistants::new("  ", None),
            Err(ProviderError::Configuration(_))
        ));
        let adapter = OpenAiAssistants::new("sk-test", Some("http://localhost:9/v1/".to_string()))
            .expect("adapter");
        assert_eq!(adapter.base_url(), "http://localhost:9/v1");
        assert!(!format!("{adapter:?}").contains("sk-test"));
    }
}
