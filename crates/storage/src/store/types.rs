#![forbid(unsafe_code)]

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkKind {
    Chunk,
    Decision,
}

impl ChunkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chunk => "chunk",
            Self::Decision => "decision",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "chunk" => Some(Self::Chunk),
            "decision" => Some(Self::Decision),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChunkRow {
    pub id: String,
    pub kind: ChunkKind,
    pub repository: String,
    pub session_id: String,
    pub branch: Option<String>,
    pub content: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub files_modified: Vec<String>,
    pub tools_used: Vec<String>,
    pub decision: Option<String>,
    pub rationale: Option<String>,
    pub created_at_ms: i64,
    pub refreshed_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct ThreadRow {
    pub id: String,
    pub repository: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub chunk_ids: Vec<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct RelationshipRow {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub kind: String,
    pub confidence: f64,
    pub note: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct AliasRow {
    pub repository: String,
    pub name: String,
    pub kind: String,
    pub target: String,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct SessionRow {
    pub id: String,
    pub repository: String,
    pub title: String,
    pub status: String,
    pub summary: Option<String>,
    pub started_at_ms: i64,
    pub ended_at_ms: Option<i64>,
}

#[derive(Clone, Debug)]
pub struct TodoRow {
    pub id: String,
    pub session_id: String,
    pub ordinal: i64,
    pub content: String,
    pub status: TodoStatus,
    pub priority: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct BulkOpRow {
    pub id: String,
    pub kind: String,
    pub status: String,
    pub total: i64,
    pub processed: i64,
    pub failed: i64,
    pub created_at_ms: i64,
    pub finished_at_ms: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RepoStats {
    pub chunks: i64,
    pub decisions: i64,
    pub threads: i64,
    pub relationships: i64,
    pub aliases: i64,
    pub sessions_active: i64,
    pub oldest_ms: Option<i64>,
    pub newest_ms: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TodoStats {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
}
