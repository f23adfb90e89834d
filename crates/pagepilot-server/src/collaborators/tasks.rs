use async_trait::async_trait;
use pagepilot_agent::{CreatedTask, NewTask, TaskBoard, ToolError};
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredTask {
    pub task_id: String,
    pub task: NewTask,
}

/// Process-local task board. Tasks live as long as the server does.
#[derive(Clone, Debug, Default)]
pub struct InMemoryTaskBoard {
    tasks: Arc<Mutex<Vec<StoredTask>>>,
}

impl InMemoryTaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> Vec<StoredTask> {
        self.tasks
            .lock()
            .map(|tasks| tasks.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TaskBoard for InMemoryTaskBoard {
    async fn create_task(&self, task: NewTask) -> Result<CreatedTask, ToolError> {
        let task_id = format!("task_{}", Uuid::new_v4().simple());
        let board = task.board;
        self.tasks
            .lock()
            .map_err(|_| ToolError::Execution("task board lock poisoned".to_string()))?
            .push(StoredTask {
                task_id: task_id.clone(),
                task,
            });
        info!(task_id = %task_id, board = %board, "created task");
        Ok(CreatedTask { task_id, board })
    }
}
