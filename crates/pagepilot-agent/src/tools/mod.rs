mod dashboard;
mod dispatcher;
mod registry;

use crate::ToolError;
use pagepilot_assistant::ToolCall;
use serde_json::{Map, Value, json};

pub use dashboard::{
    CreatedTask, DashboardCollaborators, FileChange, FileCommit, NewPost, NewTask, PagePublisher,
    PublishedPost, RepositoryEditor, TaskBoard, TaskBoardKind, build_dashboard_tool_registry,
    create_task_tool, post_to_facebook_page_tool, update_repository_file_tool,
};
pub use dispatcher::{DispatchOptions, ToolDispatcher};
pub use registry::{RegisteredTool, ToolFuture, ToolHandler, ToolRegistry};

pub const POST_TO_FACEBOOK_PAGE_TOOL: &str = "postToFacebookPage";
pub const UPDATE_REPOSITORY_FILE_TOOL: &str = "updateRepositoryFile";
pub const CREATE_TASK_TOOL: &str = "createTask";

/// The single shape in which a failed tool call is reported to the assistant.
pub fn failure_envelope(message: impl Into<String>) -> Value {
    json!({ "success": false, "error": message.into() })
}

/// Adds `"success": true` to an object result.
pub fn success_envelope(fields: Value) -> Value {
    let mut object = match fields {
        Value::Object(object) => object,
        Value::Null => Map::new(),
        other => Map::from_iter([("result".to_string(), other)]),
    };
    object.insert("success".to_string(), Value::Bool(true));
    Value::Object(object)
}

pub fn is_failure_envelope(value: &Value) -> bool {
    value.get("success").and_then(Value::as_bool) == Some(false) && value.get("error").is_some()
}

pub fn required_string_argument(arguments: &Value, key: &str) -> Result<String, ToolError> {
    let value = optional_string_argument(arguments, key)?
        .ok_or_else(|| ToolError::Validation(format!("missing required argument '{key}'")))?;
    if value.trim().is_empty() {
        return Err(ToolError::Validation(format!(
            "argument '{key}' must not be empty"
        )));
    }
    Ok(value)
}

pub fn optional_string_argument(arguments: &Value, key: &str) -> Result<Option<String>, ToolError> {
    let Some(value) = arguments.get(key) else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }
    let Some(value) = value.as_str() else {
        return Err(ToolError::Validation(format!(
            "argument '{key}' must be a string"
        )));
    };
    Ok(Some(value.to_string()))
}

/// Decodes the arguments of a call, preferring the provider's raw JSON text.
///
/// Only well-formedness is checked here; handlers validate their own fields.
pub(crate) fn parse_tool_arguments(tool_call: &ToolCall) -> Result<Value, ToolError> {
    if let Some(raw_arguments) = &tool_call.raw_arguments {
        if raw_arguments.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        return serde_json::from_str::<Value>(raw_arguments).map_err(|error| {
            ToolError::Validation(format!(
                "invalid JSON arguments for tool '{}': {}",
                tool_call.name, error
            ))
        });
    }

    match &tool_call.arguments {
        Value::Null => Ok(Value::Object(Map::new())),
        arguments => Ok(arguments.clone()),
    }
}
