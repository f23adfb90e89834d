//! Tools the dashboard assistant can call.
//!
//! Each tool validates its arguments and hands a typed request to a
//! collaborator trait; the HTTP-backed collaborators live in the server crate.

use super::{
    CREATE_TASK_TOOL, POST_TO_FACEBOOK_PAGE_TOOL, RegisteredTool, ToolRegistry,
    UPDATE_REPOSITORY_FILE_TOOL, optional_string_argument, required_string_argument,
    success_envelope,
};
use crate::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::Arc;

/// Longest text the Graph API accepts for a page post.
pub const MAX_POST_CHARS: usize = 63_206;
pub const MAX_TASK_TITLE_CHARS: usize = 200;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPost {
    pub message: String,
    pub link: Option<String>,
    pub page_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPost {
    pub post_id: String,
    pub page_id: String,
}

#[async_trait]
pub trait PagePublisher: Send + Sync {
    async fn publish(&self, post: NewPost) -> Result<PublishedPost, ToolError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub content: String,
    pub commit_message: String,
    pub branch: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCommit {
    pub path: String,
    pub branch: String,
    pub commit_sha: String,
}

#[async_trait]
pub trait RepositoryEditor: Send + Sync {
    async fn commit_file(&self, change: FileChange) -> Result<FileCommit, ToolError>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskBoardKind {
    #[default]
    Marketing,
    Operations,
}

impl TaskBoardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Marketing => "marketing",
            Self::Operations => "operations",
        }
    }
}

impl Display for TaskBoardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskBoardKind {
    type Err = ToolError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "marketing" => Ok(Self::Marketing),
            "operations" => Ok(Self::Operations),
            other => Err(ToolError::Validation(format!(
                "unknown board '{other}'; expected 'marketing' or 'operations'"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub board: TaskBoardKind,
    pub assignee: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedTask {
    pub task_id: String,
    pub board: TaskBoardKind,
}

#[async_trait]
pub trait TaskBoard: Send + Sync {
    async fn create_task(&self, task: NewTask) -> Result<CreatedTask, ToolError>;
}

/// Collaborators available to this process; tools are only registered for
/// the ones that are present.
#[derive(Clone, Default)]
pub struct DashboardCollaborators {
    pub pages: Option<Arc<dyn PagePublisher>>,
    pub repository: Option<Arc<dyn RepositoryEditor>>,
    pub tasks: Option<Arc<dyn TaskBoard>>,
}

pub fn build_dashboard_tool_registry(collaborators: DashboardCollaborators) -> ToolRegistry {
    let mut registry = ToolRegistry::default();
    if let Some(pages) = collaborators.pages {
        registry.register(post_to_facebook_page_tool(pages));
    }
    if let Some(repository) = collaborators.repository {
        registry.register(update_repository_file_tool(repository));
    }
    if let Some(tasks) = collaborators.tasks {
        registry.register(create_task_tool(tasks));
    }
    registry
}

pub fn post_to_facebook_page_tool(publisher: Arc<dyn PagePublisher>) -> RegisteredTool {
    RegisteredTool::new(
        POST_TO_FACEBOOK_PAGE_TOOL,
        "Publish a post to the company's Facebook page.",
        json!({
            "type": "object",
            "required": ["message"],
            "properties": {
                "message": { "type": "string", "description": "Text of the post." },
                "link": { "type": "string", "description": "Optional URL to attach." },
                "pageId": { "type": "string", "description": "Page to post to; defaults to the configured page." }
            },
            "additionalProperties": false
        }),
        move |arguments| {
            let publisher = publisher.clone();
            async move {
                let post = parse_new_post(&arguments)?;
                let published = publisher.publish(post).await?;
                Ok(success_envelope(json!({
                    "postId": published.post_id,
                    "pageId": published.page_id,
                })))
            }
        },
    )
}

pub fn update_repository_file_tool(editor: Arc<dyn RepositoryEditor>) -> RegisteredTool {
    RegisteredTool::new(
        UPDATE_REPOSITORY_FILE_TOOL,
        "Create or replace a file in the website repository and commit the change.",
        json!({
            "type": "object",
            "required": ["path", "content", "commitMessage"],
            "properties": {
                "path": { "type": "string", "description": "Repository-relative file path." },
                "content": { "type": "string", "description": "Full new file content." },
                "commitMessage": { "type": "string" },
                "branch": { "type": "string", "description": "Target branch; defaults to the configured branch." }
            },
            "additionalProperties": false
        }),
        move |arguments| {
            let editor = editor.clone();
            async move {
                let change = parse_file_change(&arguments)?;
                let commit = editor.commit_file(change).await?;
                Ok(success_envelope(json!({
                    "path": commit.path,
                    "branch": commit.branch,
                    "commitSha": commit.commit_sha,
                })))
            }
        },
    )
}

pub fn create_task_tool(board: Arc<dyn TaskBoard>) -> RegisteredTool {
    RegisteredTool::new(
        CREATE_TASK_TOOL,
        "Create a task on the marketing or operations board.",
        json!({
            "type": "object",
            "required": ["title"],
            "properties": {
                "title": { "type": "string" },
                "description": { "type": "string" },
                "board": { "type": "string", "enum": ["marketing", "operations"] },
                "assignee": { "type": "string" },
                "dueDate": { "type": "string", "description": "Due date as YYYY-MM-DD." }
            },
            "additionalProperties": false
        }),
        move |arguments| {
            let board = board.clone();
            async move {
                let task = parse_new_task(&arguments)?;
                let created = board.create_task(task).await?;
                Ok(success_envelope(json!({
                    "taskId": created.task_id,
                    "board": created.board.as_str(),
                })))
            }
        },
    )
}

fn require_object(arguments: &Value) -> Result<(), ToolError> {
    if arguments.is_object() {
        Ok(())
    } else {
        Err(ToolError::Validation(
            "tool arguments must be a JSON object".to_string(),
        ))
    }
}

fn parse_new_post(arguments: &Value) -> Result<NewPost, ToolError> {
    require_object(arguments)?;
    let message = required_string_argument(arguments, "message")?;
    if message.chars().count() > MAX_POST_CHARS {
        return Err(ToolError::Validation(format!(
            "message exceeds {MAX_POST_CHARS} characters"
        )));
    }
    let link = optional_string_argument(arguments, "link")?.filter(|link| !link.trim().is_empty());
    if let Some(link) = &link {
        if !(link.starts_with("https://") || link.starts_with("http://")) {
            return Err(ToolError::Validation(format!(
                "link '{link}' must be an http(s) URL"
            )));
        }
    }
    Ok(NewPost {
        message,
        link,
        page_id: optional_string_argument(arguments, "pageId")?
            .filter(|page_id| !page_id.trim().is_empty()),
    })
}

fn parse_file_change(arguments: &Value) -> Result<FileChange, ToolError> {
    require_object(arguments)?;
    let path = required_string_argument(arguments, "path")?;
    validate_repository_path(&path)?;
    let content = optional_string_argument(arguments, "content")?
        .ok_or_else(|| ToolError::Validation("missing required argument 'content'".to_string()))?;
    Ok(FileChange {
        path: path.trim_start_matches("./").to_string(),
        content,
        commit_message: required_string_argument(arguments, "commitMessage")?,
        branch: optional_string_argument(arguments, "branch")?
            .filter(|branch| !branch.trim().is_empty()),
    })
}

fn validate_repository_path(path: &str) -> Result<(), ToolError> {
    if path.starts_with('/') || path.contains('\\') {
        return Err(ToolError::Validation(format!(
            "path '{path}' must be relative to the repository root"
        )));
    }
    if path.split('/').any(|segment| segment == "..") {
        return Err(ToolError::Validation(format!(
            "path '{path}' must not leave the repository"
        )));
    }
    Ok(())
}

fn parse_new_task(arguments: &Value) -> Result<NewTask, ToolError> {
    require_object(arguments)?;
    let title = required_string_argument(arguments, "title")?;
    if title.chars().count() > MAX_TASK_TITLE_CHARS {
        return Err(ToolError::Validation(format!(
            "title exceeds {MAX_TASK_TITLE_CHARS} characters"
        )));
    }
    let board = match optional_string_argument(arguments, "board")? {
        Some(board) => board.parse()?,
        None => TaskBoardKind::default(),
    };
    let due_date = optional_string_argument(arguments, "dueDate")?;
    if let Some(due_date) = &due_date {
        validate_due_date(due_date)?;
    }
    Ok(NewTask {
        title,
        description: optional_string_argument(arguments, "description")?,
        board,
        assignee: optional_string_argument(arguments, "assignee")?,
        due_date,
    })
}

fn validate_due_date(value: &str) -> Result<(), ToolError> {
    let parts: Vec<&str> = value.split('-').collect();
    let well_formed = matches!(parts.as_slice(), [year, month, day]
        if year.len() == 4 && month.len() == 2 && day.len() == 2
            && parts.iter().all(|part| part.chars().all(|c| c.is_ascii_digit())));
    let in_range = well_formed
        && matches!(parts[1].parse::<u8>(), Ok(1..=12))
        && matches!(parts[2].parse::<u8>(), Ok(1..=31));
    if in_range {
        Ok(())
    } else {
        Err(ToolError::Validation(format!(
            "dueDate '{value}' must be formatted as YYYY-MM-DD"
        )))
    }
}
