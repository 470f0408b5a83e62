#![forbid(unsafe_code)]

//! Reference business handlers backed by the SQLite store.

mod analyze;
mod bulk;
mod create;
mod maintenance;
mod read;
mod render;
mod system;
mod tasks;
mod text;
mod transfer;
mod update;

#[cfg(test)]
mod tests;

use crate::dispatch::{HandlerContext, HandlerError, HandlerId, HandlerRegistry, Options};
use mg_storage::SqliteStore;
use std::sync::{Arc, Mutex};

pub(crate) type SharedStore = Arc<Mutex<SqliteStore>>;

type StoreHandler = fn(&mut SqliteStore, &HandlerContext, Options) -> Result<Options, HandlerError>;

/// Wraps a store function: honours the call deadline, then runs under the store lock.
fn with_store(
    store: &SharedStore,
    handler: StoreHandler,
) -> impl Fn(&HandlerContext, Options) -> Result<Options, HandlerError> + Send + Sync + 'static {
    let store = Arc::clone(store);
    move |ctx: &HandlerContext, options: Options| {
        if ctx.call.deadline_passed() {
            return Err(HandlerError::DeadlineExceeded);
        }
        // A handler that panicked mid-call leaves the lock poisoned. SQLite keeps each
        // statement atomic, so the store itself is still usable.
        let mut guard = store.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(operation = ctx.operation.as_str(), "recovering poisoned store lock");
            store.clear_poison();
            poisoned.into_inner()
        });
        handler(&mut guard, ctx, options)
    }
}

macro_rules! store_handlers {
    ($builder:expr, $store:expr, { $($id:ident => $handler:path),+ $(,)? }) => {
        $builder$(.register(HandlerId::$id, with_store($store, $handler)))+
    };
}

/// Every handler the server ships. Operations left out surface as not implemented.
pub(crate) fn reference_registry(store: SqliteStore) -> HandlerRegistry {
    let store: SharedStore = Arc::new(Mutex::new(store));
    store_handlers!(HandlerRegistry::builder(), &store, {
        StoreChunk => create::store_chunk,
        StoreDecision => create::store_decision,
        CreateThread => create::create_thread,
        CreateAlias => create::create_alias,
        CreateRelationship => create::create_relationship,
        AutoDetectRelationships => create::auto_detect_relationships,
        ImportContext => create::import_context,
        BulkImport => bulk::bulk_import,
        BulkOperation => bulk::bulk_operation,
        Search => read::search,
        GetContext => read::get_context,
        FindSimilar => read::find_similar,
        GetPatterns => read::get_patterns,
        GetRelationships => read::get_relationships,
        TraverseGraph => read::traverse_graph,
        GetThreads => read::get_threads,
        SearchExplained => read::search_explained,
        SearchMultiRepo => read::search_multi_repo,
        ResolveAlias => read::resolve_alias,
        ListAliases => read::list_aliases,
        GetBulkProgress => read::get_bulk_progress,
        UpdateThread => update::update_thread,
        UpdateRelationship => update::update_relationship,
        MarkRefreshed => update::mark_refreshed,
        ResolveConflicts => update::resolve_conflicts,
        DecayManagement => maintenance::decay_management,
        DeleteExpired => maintenance::delete_expired,
        CrossRepoPatterns => analyze::cross_repo_patterns,
        FindSimilarRepositories => analyze::find_similar_repositories,
        CrossRepoInsights => analyze::cross_repo_insights,
        DetectConflicts => analyze::detect_conflicts,
        HealthDashboard => analyze::health_dashboard,
        CheckFreshness => analyze::check_freshness,
        DetectThreads => analyze::detect_threads,
        SuggestRelated => analyze::suggest_related,
        ExportProject => transfer::export_project,
        BulkExport => transfer::bulk_export,
        Continuity => transfer::continuity,
        TodoWrite => tasks::todo_write,
        TodoRead => tasks::todo_read,
        TodoUpdate => tasks::todo_update,
        SessionCreate => tasks::session_create,
        SessionEnd => tasks::session_end,
        SessionList => tasks::session_list,
        WorkflowAnalyze => tasks::workflow_analyze,
        TaskCompletionStats => tasks::task_completion_stats,
        Health => system::health,
        Status => system::status,
        GenerateCitations => system::generate_citations,
        CreateInlineCitation => system::create_inline_citation,
        GetDocumentation => system::get_documentation,
    })
    .build()
}
