#![forbid(unsafe_code)]

use super::{HandlerError, Options};
use mg_core::entry::EntryPoint;
use mg_core::ops::Operation;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

macro_rules! handler_ids {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// One fine-grained business operation.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub(crate) enum HandlerId {
            $($variant),+
        }

        impl HandlerId {
            #[cfg(test)]
            pub(crate) const ALL: &'static [HandlerId] = &[$(Self::$variant),+];

            pub(crate) fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }
    };
}

handler_ids! {
    StoreChunk => "store_chunk",
    StoreDecision => "store_decision",
    CreateThread => "create_thread",
    CreateAlias => "create_alias",
    CreateRelationship => "create_relationship",
    AutoDetectRelationships => "auto_detect_relationships",
    ImportContext => "import_context",
    BulkImport => "bulk_import",
    BulkOperation => "bulk_operation",
    Search => "search",
    GetContext => "get_context",
    FindSimilar => "find_similar",
    GetPatterns => "get_patterns",
    GetRelationships => "get_relationships",
    TraverseGraph => "traverse_graph",
    GetThreads => "get_threads",
    SearchExplained => "search_explained",
    SearchMultiRepo => "search_multi_repo",
    ResolveAlias => "resolve_alias",
    ListAliases => "list_aliases",
    GetBulkProgress => "get_bulk_progress",
    UpdateThread => "update_thread",
    UpdateRelationship => "update_relationship",
    MarkRefreshed => "mark_refreshed",
    ResolveConflicts => "resolve_conflicts",
    DecayManagement => "decay_management",
    DeleteExpired => "delete_expired",
    CrossRepoPatterns => "cross_repo_patterns",
    FindSimilarRepositories => "find_similar_repositories",
    CrossRepoInsights => "cross_repo_insights",
    DetectConflicts => "detect_conflicts",
    HealthDashboard => "health_dashboard",
    CheckFreshness => "check_freshness",
    DetectThreads => "detect_threads",
    SuggestRelated => "suggest_related",
    AutoInsights => "auto_insights",
    PatternPrediction => "pattern_prediction",
    ExportProject => "export_project",
    BulkExport => "bulk_export",
    Continuity => "continuity",
    TodoWrite => "todo_write",
    TodoRead => "todo_read",
    TodoUpdate => "todo_update",
    SessionCreate => "session_create",
    SessionEnd => "session_end",
    SessionList => "session_list",
    WorkflowAnalyze => "workflow_analyze",
    TaskCompletionStats => "task_completion_stats",
    Health => "health",
    Status => "status",
    GenerateCitations => "generate_citations",
    CreateInlineCitation => "create_inline_citation",
    GetDocumentation => "get_documentation",
}

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call data forwarded to handlers without interpretation.
#[derive(Clone, Debug, Default)]
pub(crate) struct CallContext {
    pub(crate) request_id: Option<Value>,
    pub(crate) deadline: Option<Instant>,
}

impl CallContext {
    pub(crate) fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct HandlerContext {
    pub(crate) call: CallContext,
    pub(crate) entry_point: EntryPoint,
    pub(crate) operation: Operation,
    /// Advisory; the dispatcher passes it through unvalidated.
    pub(crate) scope: String,
}

pub(crate) trait Handler: Send + Sync {
    fn call(&self, ctx: &HandlerContext, options: Options) -> Result<Options, HandlerError>;
}

impl<F> Handler for F
where
    F: Fn(&HandlerContext, Options) -> Result<Options, HandlerError> + Send + Sync,
{
    fn call(&self, ctx: &HandlerContext, options: Options) -> Result<Options, HandlerError> {
        self(ctx, options)
    }
}

/// Immutable after `build()`.
#[derive(Clone, Default)]
pub(crate) struct HandlerRegistry {
    handlers: BTreeMap<HandlerId, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub(crate) fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    pub(crate) fn get(&self, id: HandlerId) -> Option<&dyn Handler> {
        self.handlers.get(&id).map(|handler| handler.as_ref())
    }

    pub(crate) fn contains(&self, id: HandlerId) -> bool {
        self.handlers.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers.len()
    }
}

#[derive(Default)]
pub(crate) struct HandlerRegistryBuilder {
    handlers: BTreeMap<HandlerId, Arc<dyn Handler>>,
}

impl HandlerRegistryBuilder {
    /// Later registrations for the same id replace earlier ones.
    pub(crate) fn register<F>(mut self, id: HandlerId, handler: F) -> Self
    where
        F: Fn(&HandlerContext, Options) -> Result<Options, HandlerError> + Send + Sync + 'static,
    {
        self.handlers.insert(id, Arc::new(handler));
        self
    }

    pub(crate) fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            handlers: self.handlers,
        }
    }
}
