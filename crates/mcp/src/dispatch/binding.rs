#![forbid(unsafe_code)]

use super::HandlerId;
use mg_core::ops::{
    AnalyzeOp, BulkKind, CreateOp, DeleteOp, IntelligenceOp, Operation, ReadOp, SystemOp,
    TasksOp, TransferOp, UpdateOp,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Binding {
    Direct(HandlerId),
    /// Injects `operation = <kind>` into the options and calls the shared bulk handler.
    Bulk(BulkKind),
    /// Declared on the surface, no handler behind it yet.
    Placeholder,
}

pub(crate) fn binding_for(operation: Operation) -> Binding {
    use Binding::{Bulk, Direct, Placeholder};
    use HandlerId as H;

    match operation {
        Operation::Create(op) => match op {
            CreateOp::StoreChunk => Direct(H::StoreChunk),
            CreateOp::StoreDecision => Direct(H::StoreDecision),
            CreateOp::CreateThread => Direct(H::CreateThread),
            CreateOp::CreateAlias => Direct(H::CreateAlias),
            CreateOp::CreateRelationship => Direct(H::CreateRelationship),
            CreateOp::AutoDetectRelationships => Direct(H::AutoDetectRelationships),
            CreateOp::ImportContext => Direct(H::ImportContext),
            CreateOp::BulkImport => Direct(H::BulkImport),
        },
        Operation::Read(op) => match op {
            ReadOp::Search => Direct(H::Search),
            ReadOp::GetContext => Direct(H::GetContext),
            ReadOp::FindSimilar => Direct(H::FindSimilar),
            ReadOp::GetPatterns => Direct(H::GetPatterns),
            ReadOp::GetRelationships => Direct(H::GetRelationships),
            ReadOp::TraverseGraph => Direct(H::TraverseGraph),
            ReadOp::GetThreads => Direct(H::GetThreads),
            ReadOp::SearchExplained => Direct(H::SearchExplained),
            ReadOp::SearchMultiRepo => Direct(H::SearchMultiRepo),
            ReadOp::ResolveAlias => Direct(H::ResolveAlias),
            ReadOp::ListAliases => Direct(H::ListAliases),
            ReadOp::GetBulkProgress => Direct(H::GetBulkProgress),
        },
        Operation::Update(op) => match op {
            UpdateOp::UpdateThread => Direct(H::UpdateThread),
            UpdateOp::UpdateRelationship => Direct(H::UpdateRelationship),
            UpdateOp::MarkRefreshed => Direct(H::MarkRefreshed),
            UpdateOp::ResolveConflicts => Direct(H::ResolveConflicts),
            UpdateOp::BulkUpdate => Bulk(BulkKind::Update),
            UpdateOp::DecayManagement => Direct(H::DecayManagement),
        },
        Operation::Delete(op) => match op {
            DeleteOp::BulkDelete => Bulk(BulkKind::Delete),
            DeleteOp::DeleteExpired => Direct(H::DeleteExpired),
            DeleteOp::DeleteByFilter => Placeholder,
        },
        Operation::Analyze(op) => match op {
            AnalyzeOp::CrossRepoPatterns => Direct(H::CrossRepoPatterns),
            AnalyzeOp::FindSimilarRepositories => Direct(H::FindSimilarRepositories),
            AnalyzeOp::CrossRepoInsights => Direct(H::CrossRepoInsights),
            AnalyzeOp::DetectConflicts => Direct(H::DetectConflicts),
            AnalyzeOp::HealthDashboard => Direct(H::HealthDashboard),
            AnalyzeOp::CheckFreshness => Direct(H::CheckFreshness),
            AnalyzeOp::DetectThreads => Direct(H::DetectThreads),
        },
        Operation::Intelligence(op) => match op {
            IntelligenceOp::SuggestRelated => Direct(H::SuggestRelated),
            IntelligenceOp::AutoInsights => Direct(H::AutoInsights),
            IntelligenceOp::PatternPrediction => Direct(H::PatternPrediction),
        },
        Operation::Transfer(op) => match op {
            TransferOp::ExportProject => Direct(H::ExportProject),
            TransferOp::BulkExport => Direct(H::BulkExport),
            TransferOp::Continuity => Direct(H::Continuity),
            TransferOp::ImportContext => Direct(H::ImportContext),
        },
        Operation::Tasks(op) => match op {
            TasksOp::TodoWrite => Direct(H::TodoWrite),
            TasksOp::TodoRead => Direct(H::TodoRead),
            TasksOp::TodoUpdate => Direct(H::TodoUpdate),
            TasksOp::SessionCreate => Direct(H::SessionCreate),
            TasksOp::SessionEnd => Direct(H::SessionEnd),
            TasksOp::SessionList => Direct(H::SessionList),
            TasksOp::WorkflowAnalyze => Direct(H::WorkflowAnalyze),
            TasksOp::TaskCompletionStats => Direct(H::TaskCompletionStats),
        },
        Operation::System(op) => match op {
            SystemOp::Health => Direct(H::Health),
            SystemOp::Status => Direct(H::Status),
            SystemOp::GenerateCitations => Direct(H::GenerateCitations),
            SystemOp::CreateInlineCitation => Direct(H::CreateInlineCitation),
            SystemOp::GetDocumentation => Direct(H::GetDocumentation),
        },
    }
}
