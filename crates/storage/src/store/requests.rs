#![forbid(unsafe_code)]

use super::{ChunkKind, TodoStatus};

#[derive(Clone, Debug)]
pub struct NewChunk {
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
}

/// Filters are ANDed; `text` is a case-insensitive substring match on content and summary.
#[derive(Clone, Debug, Default)]
pub struct ChunkQuery {
    pub repository: Option<String>,
    pub session_id: Option<String>,
    pub kind: Option<ChunkKind>,
    pub text: Option<String>,
    pub tag: Option<String>,
    pub limit: usize,
}

#[derive(Clone, Debug, Default)]
pub struct ChunkPatch {
    pub content: Option<String>,
    pub summary: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Clone, Debug)]
pub struct NewThread {
    pub id: String,
    pub repository: String,
    pub title: String,
    pub description: Option<String>,
    pub chunk_ids: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ThreadPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub add_chunk_ids: Vec<String>,
    pub remove_chunk_ids: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct NewRelationship {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub kind: String,
    pub confidence: f64,
    pub note: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct RelationshipPatch {
    pub kind: Option<String>,
    pub confidence: Option<f64>,
    pub note: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewAlias {
    pub repository: String,
    pub name: String,
    pub kind: String,
    pub target: String,
}

#[derive(Clone, Debug)]
pub struct NewSession {
    pub id: String,
    pub repository: String,
    pub title: String,
}

#[derive(Clone, Debug)]
pub struct NewTodo {
    pub id: String,
    pub content: String,
    pub status: TodoStatus,
    pub priority: String,
}
