#![forbid(unsafe_code)]

//! Legacy endpoint names and where each one lands on the consolidated surface.

use crate::entry::EntryPoint;
use crate::ops::{
    AnalyzeOp, BulkKind, CreateOp, DeleteOp, IntelligenceOp, Operation, ReadOp, SystemOp,
    TransferOp, UpdateOp,
};
use std::collections::BTreeSet;

pub const LEGACY_PREFIX: &str = "mcp__memory__memory_";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaticRoute {
    pub entry_point: EntryPoint,
    pub operation: Operation,
    pub scope: &'static str,
}

impl StaticRoute {
    pub const fn new(entry_point: EntryPoint, operation: Operation, scope: &'static str) -> Self {
        Self {
            entry_point,
            operation,
            scope,
        }
    }
}

/// Target selected by the value of `field` inside the call payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DynamicRoute {
    pub field: &'static str,
    pub routes: &'static [(&'static str, StaticRoute)],
}

impl DynamicRoute {
    pub fn lookup(&self, value: &str) -> Option<StaticRoute> {
        self.routes
            .iter()
            .find(|(candidate, _)| *candidate == value)
            .map(|(_, route)| *route)
    }

    pub fn values(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.routes.iter().map(|(value, _)| *value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Static(StaticRoute),
    Dynamic(DynamicRoute),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LegacyTool {
    pub name: &'static str,
    pub summary: &'static str,
    pub route: Route,
}

impl LegacyTool {
    /// Deprecation text shown in `tools/list`.
    pub fn description(&self) -> String {
        match &self.route {
            Route::Static(route) => format!(
                "[LEGACY] {} - Use {} with operation='{}' instead",
                self.summary,
                route.entry_point.tool_name(),
                route.operation.as_str()
            ),
            Route::Dynamic(route) => {
                let mut targets: Vec<&'static str> = Vec::new();
                for (_, target) in route.routes {
                    let tool = target.entry_point.tool_name();
                    if !targets.contains(&tool) {
                        targets.push(tool);
                    }
                }
                format!("[LEGACY] {} - Use {} instead", self.summary, join_or(&targets))
            }
        }
    }
}

fn join_or(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, second] => format!("{first} or {second}"),
        [head @ .., last] => format!("{}, or {last}", head.join(", ")),
    }
}

const fn fixed(
    name: &'static str,
    summary: &'static str,
    entry_point: EntryPoint,
    operation: Operation,
    scope: &'static str,
) -> LegacyTool {
    LegacyTool {
        name,
        summary,
        route: Route::Static(StaticRoute::new(entry_point, operation, scope)),
    }
}

use EntryPoint as E;
use Operation as O;

pub const BULK_TOOL_NAME: &str = "mcp__memory__memory_bulk_operation";

const BULK_ROUTES: &[(&str, StaticRoute)] = &[
    (
        "store",
        StaticRoute::new(E::Create, O::Create(CreateOp::BulkImport), "bulk"),
    ),
    (
        "update",
        StaticRoute::new(E::Update, O::Update(UpdateOp::BulkUpdate), "bulk"),
    ),
    (
        "delete",
        StaticRoute::new(E::Delete, O::Delete(DeleteOp::BulkDelete), "bulk"),
    ),
];

pub static BULK_TOOL: LegacyTool = LegacyTool {
    name: BULK_TOOL_NAME,
    summary: "Execute bulk operations",
    route: Route::Dynamic(DynamicRoute {
        field: "operation",
        routes: BULK_ROUTES,
    }),
};

#[rustfmt::skip]
pub const LEGACY_TOOLS: &[LegacyTool] = &[
    // create
    fixed("mcp__memory__memory_store_chunk", "Store important conversation moments", E::Create, O::Create(CreateOp::StoreChunk), "single"),
    fixed("mcp__memory__memory_store_decision", "Store architectural/design decisions", E::Create, O::Create(CreateOp::StoreDecision), "single"),
    fixed("mcp__memory__memory_create_thread", "Create memory thread from chunks", E::Create, O::Create(CreateOp::CreateThread), "single"),
    fixed("mcp__memory__memory_create_alias", "Create memory aliases", E::Create, O::Create(CreateOp::CreateAlias), "single"),
    fixed("mcp__memory__memory_link", "Create relationship between chunks", E::Create, O::Create(CreateOp::CreateRelationship), "single"),
    fixed("mcp__memory__memory_auto_detect_relationships", "Auto-detect relationships", E::Create, O::Create(CreateOp::AutoDetectRelationships), "single"),
    fixed("mcp__memory__memory_import_context", "Import conversation context", E::Create, O::Create(CreateOp::ImportContext), "single"),
    fixed("mcp__memory__memory_bulk_import", "Import from various formats", E::Create, O::Create(CreateOp::BulkImport), "bulk"),
    // read
    fixed("mcp__memory__memory_search", "Search past memories", E::Read, O::Read(ReadOp::Search), "single"),
    fixed("mcp__memory__memory_get_context", "Get project overview", E::Read, O::Read(ReadOp::GetContext), "single"),
    fixed("mcp__memory__memory_find_similar", "Find similar problems", E::Read, O::Read(ReadOp::FindSimilar), "single"),
    fixed("mcp__memory__memory_get_patterns", "Get recurring patterns", E::Read, O::Read(ReadOp::GetPatterns), "single"),
    fixed("mcp__memory__memory_get_relationships", "Get relationships for chunk", E::Read, O::Read(ReadOp::GetRelationships), "single"),
    fixed("mcp__memory__memory_traverse_graph", "Traverse knowledge graph", E::Read, O::Read(ReadOp::TraverseGraph), "single"),
    fixed("mcp__memory__memory_get_threads", "Retrieve memory threads", E::Read, O::Read(ReadOp::GetThreads), "single"),
    fixed("mcp__memory__memory_search_explained", "Search with explanations", E::Read, O::Read(ReadOp::SearchExplained), "single"),
    fixed("mcp__memory__memory_search_multi_repo", "Search across repositories", E::Read, O::Read(ReadOp::SearchMultiRepo), "cross_repo"),
    fixed("mcp__memory__memory_resolve_alias", "Resolve alias references", E::Read, O::Read(ReadOp::ResolveAlias), "single"),
    fixed("mcp__memory__memory_list_aliases", "List aliases with filtering", E::Read, O::Read(ReadOp::ListAliases), "single"),
    fixed("mcp__memory__memory_get_bulk_progress", "Get bulk operation progress", E::Read, O::Read(ReadOp::GetBulkProgress), "bulk"),
    // update
    fixed("mcp__memory__memory_update_thread", "Update thread properties", E::Update, O::Update(UpdateOp::UpdateThread), "single"),
    fixed("mcp__memory__memory_update_relationship", "Update relationship metadata", E::Update, O::Update(UpdateOp::UpdateRelationship), "single"),
    fixed("mcp__memory__memory_mark_refreshed", "Mark memory as refreshed", E::Update, O::Update(UpdateOp::MarkRefreshed), "single"),
    fixed("mcp__memory__memory_resolve_conflicts", "Resolve memory conflicts", E::Update, O::Update(UpdateOp::ResolveConflicts), "single"),
    fixed("mcp__memory__memory_decay_management", "Manage memory decay", E::Update, O::Update(UpdateOp::DecayManagement), "single"),
    // delete
    fixed("mcp__memory__memory_bulk_operation_delete", "Bulk delete operations", E::Delete, O::Delete(DeleteOp::BulkDelete), "bulk"),
    // analyze
    fixed("mcp__memory__memory_analyze_cross_repo_patterns", "Analyze cross-repo patterns", E::Analyze, O::Analyze(AnalyzeOp::CrossRepoPatterns), "cross_repo"),
    fixed("mcp__memory__memory_find_similar_repositories", "Find similar repositories", E::Analyze, O::Analyze(AnalyzeOp::FindSimilarRepositories), "cross_repo"),
    fixed("mcp__memory__memory_get_cross_repo_insights", "Get cross-repo insights", E::Analyze, O::Analyze(AnalyzeOp::CrossRepoInsights), "cross_repo"),
    fixed("mcp__memory__memory_conflicts", "Detect contradictory decisions", E::Analyze, O::Analyze(AnalyzeOp::DetectConflicts), "single"),
    fixed("mcp__memory__memory_health_dashboard", "Get health dashboard", E::Analyze, O::Analyze(AnalyzeOp::HealthDashboard), "single"),
    fixed("mcp__memory__memory_check_freshness", "Check memory staleness", E::Analyze, O::Analyze(AnalyzeOp::CheckFreshness), "single"),
    fixed("mcp__memory__memory_detect_threads", "Auto-detect memory threads", E::Analyze, O::Analyze(AnalyzeOp::DetectThreads), "single"),
    // intelligence
    fixed("mcp__memory__memory_suggest_related", "Get AI suggestions", E::Intelligence, O::Intelligence(IntelligenceOp::SuggestRelated), "single"),
    // transfer
    fixed("mcp__memory__memory_export_project", "Export project memory data", E::Transfer, O::Transfer(TransferOp::ExportProject), "project"),
    fixed("mcp__memory__memory_bulk_export", "Export with filtering", E::Transfer, O::Transfer(TransferOp::BulkExport), "bulk"),
    fixed("mcp__memory__memory_continuity", "Get incomplete work", E::Transfer, O::Transfer(TransferOp::Continuity), "single"),
    // system
    fixed("mcp__memory__memory_health", "Basic health check", E::System, O::System(SystemOp::Health), "system"),
    fixed("mcp__memory__memory_status", "Comprehensive status", E::System, O::System(SystemOp::Status), "repository"),
    fixed("mcp__memory__memory_generate_citations", "Generate formatted citations", E::System, O::System(SystemOp::GenerateCitations), "single"),
    fixed("mcp__memory__memory_create_inline_citation", "Create inline citations", E::System, O::System(SystemOp::CreateInlineCitation), "single"),
];

/// Static entries followed by the bulk endpoint.
pub fn legacy_tools() -> impl Iterator<Item = &'static LegacyTool> {
    LEGACY_TOOLS.iter().chain(std::iter::once(&BULK_TOOL))
}

pub fn bulk_route(kind: BulkKind) -> Option<StaticRoute> {
    match &BULK_TOOL.route {
        Route::Dynamic(route) => route.lookup(kind.as_str()),
        Route::Static(_) => None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableError {
    DuplicateName(&'static str),
    ShadowsConsolidated(&'static str),
    OperationOutsideEntryPoint {
        name: &'static str,
        entry_point: EntryPoint,
        operation: Operation,
    },
    EmptyDynamicField(&'static str),
    DuplicateRouteValue {
        name: &'static str,
        value: &'static str,
    },
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateName(name) => write!(f, "duplicate legacy tool name: {name}"),
            Self::ShadowsConsolidated(name) => {
                write!(f, "legacy tool name shadows a consolidated tool: {name}")
            }
            Self::OperationOutsideEntryPoint {
                name,
                entry_point,
                operation,
            } => write!(
                f,
                "{name}: operation {operation} is not an operation of {}",
                entry_point.tool_name()
            ),
            Self::EmptyDynamicField(name) => write!(f, "{name}: dynamic route has no field"),
            Self::DuplicateRouteValue { name, value } => {
                write!(f, "{name}: dynamic route value '{value}' is bound twice")
            }
        }
    }
}

impl std::error::Error for TableError {}

fn check_static(name: &'static str, route: &StaticRoute) -> Result<(), TableError> {
    if route.operation.entry_point() != route.entry_point {
        return Err(TableError::OperationOutsideEntryPoint {
            name,
            entry_point: route.entry_point,
            operation: route.operation,
        });
    }
    Ok(())
}

pub fn validate_legacy_table<'a>(
    tools: impl IntoIterator<Item = &'a LegacyTool>,
) -> Result<(), TableError> {
    let mut seen = BTreeSet::new();
    for tool in tools {
        if !seen.insert(tool.name) {
            return Err(TableError::DuplicateName(tool.name));
        }
        if EntryPoint::from_tool_name(tool.name).is_some() {
            return Err(TableError::ShadowsConsolidated(tool.name));
        }
        match &tool.route {
            Route::Static(route) => check_static(tool.name, route)?,
            Route::Dynamic(route) => {
                if route.field.is_empty() {
                    return Err(TableError::EmptyDynamicField(tool.name));
                }
                let mut values = BTreeSet::new();
                for (value, target) in route.routes {
                    if !values.insert(*value) {
                        return Err(TableError::DuplicateRouteValue {
                            name: tool.name,
                            value: *value,
                        });
                    }
                    check_static(tool.name, target)?;
                }
            }
        }
    }
    Ok(())
}
