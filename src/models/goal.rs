use serde::{Deserialize, Deserializer, Serialize};

/// A named, categorized unit of intent in the goal graph.
///
/// Goals are addressed by a user-chosen string `id` (case-sensitive). Edges are
/// kept as id references in `children` and `parents` rather than pointers, so
/// the graph can hold cycles without any ownership tangles. Both lists keep
/// link creation order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoalNode {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub parents: Vec<String>,
}

impl GoalNode {
    pub fn new(id: impl Into<String>, description: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            category,
            children: Vec::new(),
            parents: Vec::new(),
        }
    }
}

/// A directed "supports / leads to" edge from a prerequisite goal to a dependent goal.
///
/// At most one link exists per ordered `(source, target)` pair. The `id` is the
/// display key `"{source}-{target}"`; it is derived, never authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoalLink {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub id: String,
}

impl GoalLink {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        let id = format!("{}-{}", source, target);
        Self { source, target, id }
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }

    pub fn connects(&self, source: &str, target: &str) -> bool {
        self.source == source && self.target == target
    }
}

/// Display grouping for a goal.
///
/// The five categories and their colors are fixed; they are the only
/// configuration the goal graph has.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    Personal,
    Work,
    Learning,
    Health,
    Financial,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Self::Personal,
        Self::Work,
        Self::Learning,
        Self::Health,
        Self::Financial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Work => "work",
            Self::Learning => "learning",
            Self::Health => "health",
            Self::Financial => "financial",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "personal" => Some(Self::Personal),
            "work" => Some(Self::Work),
            "learning" => Some(Self::Learning),
            "health" => Some(Self::Health),
            "financial" => Some(Self::Financial),
            _ => None,
        }
    }

    /// Parse a stored category, falling back to `Personal` for anything unknown.
    pub fn parse_lenient(s: &str) -> Self {
        Self::from_str(s).unwrap_or_default()
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Personal => "#7289da",
            Self::Work => "#43b581",
            Self::Learning => "#faa61a",
            Self::Health => "#ed4245",
            Self::Financial => "#9b59b6",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Personal => "Personal",
            Self::Work => "Work",
            Self::Learning => "Learning",
            Self::Health => "Health",
            Self::Financial => "Financial",
        }
    }
}

// Stored and imported documents may carry categories this build doesn't know.
impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for creating a goal, optionally hanging it under an existing parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGoalInput {
    pub id: String,
    pub description: String,
    /// Defaults to `Personal` if not specified.
    pub category: Option<Category>,
    /// When set, a link `parent -> id` is created after the goal is added.
    pub parent: Option<String>,
}

/// Input for editing a goal. Omitted fields keep their current value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateGoalInput {
    pub description: Option<String>,
    pub category: Option<Category>,
}

/// Input for linking two existing goals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLinkInput {
    pub source: String,
    pub target: String,
}

/// The persisted and exported shape of a goal graph: `{ nodes: [...], links: [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphSnapshot {
    pub nodes: Vec<GoalNode>,
    pub links: Vec<GoalLink>,
}
