use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A to-do item, optionally tied to a goal.
///
/// Tasks live in one of two lists, active or completed, and move between
/// them. `goal_id` is a plain foreign key into the goal graph; the graph
/// itself knows nothing about tasks.
///
/// Daily tasks record the date they were last completed so they can be
/// reactivated the next day (see [`crate::db::Database::reset_daily_tasks`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub text: String,
    pub priority: Priority,
    pub goal_id: Option<String>,
    pub is_daily: bool,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_completed: Option<NaiveDate>,
}

/// Which list a task is on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Active,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskInput {
    pub text: String,
    /// Defaults to `Medium` if not specified.
    pub priority: Option<Priority>,
    pub goal_id: Option<String>,
    #[serde(default)]
    pub is_daily: bool,
}

/// Input for editing a task. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskInput {
    pub text: Option<String>,
    pub priority: Option<Priority>,
    pub goal_id: Option<String>,
    pub is_daily: Option<bool>,
}

/// Both task lists, as returned by list endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskLists {
    pub active: Vec<Task>,
    pub completed: Vec<Task>,
}
