#![forbid(unsafe_code)]

pub mod routes;

pub mod entry {
    /// The nine consolidated entry points.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub enum EntryPoint {
        Create,
        Read,
        Update,
        Delete,
        Analyze,
        Intelligence,
        Transfer,
        Tasks,
        System,
    }

    pub const TOOL_PREFIX: &str = "memory_";

    impl EntryPoint {
        pub const ALL: [EntryPoint; 9] = [
            Self::Create,
            Self::Read,
            Self::Update,
            Self::Delete,
            Self::Analyze,
            Self::Intelligence,
            Self::Transfer,
            Self::Tasks,
            Self::System,
        ];

        pub fn as_str(self) -> &'static str {
            match self {
                Self::Create => "create",
                Self::Read => "read",
                Self::Update => "update",
                Self::Delete => "delete",
                Self::Analyze => "analyze",
                Self::Intelligence => "intelligence",
                Self::Transfer => "transfer",
                Self::Tasks => "tasks",
                Self::System => "system",
            }
        }

        pub fn tool_name(self) -> &'static str {
            match self {
                Self::Create => "memory_create",
                Self::Read => "memory_read",
                Self::Update => "memory_update",
                Self::Delete => "memory_delete",
                Self::Analyze => "memory_analyze",
                Self::Intelligence => "memory_intelligence",
                Self::Transfer => "memory_transfer",
                Self::Tasks => "memory_tasks",
                Self::System => "memory_system",
            }
        }

        pub fn from_tool_name(name: &str) -> Option<Self> {
            let suffix = name.strip_prefix(TOOL_PREFIX)?;
            Self::ALL.into_iter().find(|ep| ep.as_str() == suffix)
        }

        /// Allowed scope values, default first.
        pub fn scopes(self) -> &'static [&'static str] {
            match self {
                Self::Create | Self::Update => &["single", "bulk"],
                Self::Read | Self::Analyze => &["single", "cross_repo", "global"],
                Self::Delete => &["bulk", "filtered"],
                Self::Intelligence => &["single", "cross_repo"],
                Self::Transfer => &["single", "bulk", "project"],
                Self::Tasks => &["session", "workflow", "global"],
                Self::System => &["system", "repository"],
            }
        }

        pub fn default_scope(self) -> &'static str {
            self.scopes()[0]
        }

        /// `system` tolerates a missing options object; every other entry point requires one.
        pub fn options_optional(self) -> bool {
            matches!(self, Self::System)
        }
    }

    impl std::fmt::Display for EntryPoint {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.as_str())
        }
    }
}

pub mod ops {
    use crate::entry::EntryPoint;

    macro_rules! operation_enum {
        ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub enum $name {
                $($variant),+
            }

            impl $name {
                pub const ALL: &'static [$name] = &[$(Self::$variant),+];

                pub fn as_str(self) -> &'static str {
                    match self {
                        $(Self::$variant => $wire),+
                    }
                }

                /// Literal match: no trimming, no case folding.
                pub fn parse(raw: &str) -> Option<Self> {
                    match raw {
                        $($wire => Some(Self::$variant),)+
                        _ => None,
                    }
                }
            }
        };
    }

    operation_enum!(CreateOp {
        StoreChunk => "store_chunk",
        StoreDecision => "store_decision",
        CreateThread => "create_thread",
        CreateAlias => "create_alias",
        CreateRelationship => "create_relationship",
        AutoDetectRelationships => "auto_detect_relationships",
        ImportContext => "import_context",
        BulkImport => "bulk_import",
    });

    operation_enum!(ReadOp {
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
    });

    operation_enum!(UpdateOp {
        UpdateThread => "update_thread",
        UpdateRelationship => "update_relationship",
        MarkRefreshed => "mark_refreshed",
        ResolveConflicts => "resolve_conflicts",
        BulkUpdate => "bulk_update",
        DecayManagement => "decay_management",
    });

    operation_enum!(DeleteOp {
        BulkDelete => "bulk_delete",
        DeleteExpired => "delete_expired",
        DeleteByFilter => "delete_by_filter",
    });

    operation_enum!(AnalyzeOp {
        CrossRepoPatterns => "cross_repo_patterns",
        FindSimilarRepositories => "find_similar_repositories",
        CrossRepoInsights => "cross_repo_insights",
        DetectConflicts => "detect_conflicts",
        HealthDashboard => "health_dashboard",
        CheckFreshness => "check_freshness",
        DetectThreads => "detect_threads",
    });

    operation_enum!(IntelligenceOp {
        SuggestRelated => "suggest_related",
        AutoInsights => "auto_insights",
        PatternPrediction => "pattern_prediction",
    });

    operation_enum!(TransferOp {
        ExportProject => "export_project",
        BulkExport => "bulk_export",
        Continuity => "continuity",
        ImportContext => "import_context",
    });

    operation_enum!(TasksOp {
        TodoWrite => "todo_write",
        TodoRead => "todo_read",
        TodoUpdate => "todo_update",
        SessionCreate => "session_create",
        SessionEnd => "session_end",
        SessionList => "session_list",
        WorkflowAnalyze => "workflow_analyze",
        TaskCompletionStats => "task_completion_stats",
    });

    operation_enum!(SystemOp {
        Health => "health",
        Status => "status",
        GenerateCitations => "generate_citations",
        CreateInlineCitation => "create_inline_citation",
        GetDocumentation => "get_documentation",
    });

    /// An operation already resolved against its entry point.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub enum Operation {
        Create(CreateOp),
        Read(ReadOp),
        Update(UpdateOp),
        Delete(DeleteOp),
        Analyze(AnalyzeOp),
        Intelligence(IntelligenceOp),
        Transfer(TransferOp),
        Tasks(TasksOp),
        System(SystemOp),
    }

    impl Operation {
        pub fn parse(entry_point: EntryPoint, raw: &str) -> Option<Self> {
            match entry_point {
                EntryPoint::Create => CreateOp::parse(raw).map(Self::Create),
                EntryPoint::Read => ReadOp::parse(raw).map(Self::Read),
                EntryPoint::Update => UpdateOp::parse(raw).map(Self::Update),
                EntryPoint::Delete => DeleteOp::parse(raw).map(Self::Delete),
                EntryPoint::Analyze => AnalyzeOp::parse(raw).map(Self::Analyze),
                EntryPoint::Intelligence => IntelligenceOp::parse(raw).map(Self::Intelligence),
                EntryPoint::Transfer => TransferOp::parse(raw).map(Self::Transfer),
                EntryPoint::Tasks => TasksOp::parse(raw).map(Self::Tasks),
                EntryPoint::System => SystemOp::parse(raw).map(Self::System),
            }
        }

        pub fn entry_point(self) -> EntryPoint {
            match self {
                Self::Create(_) => EntryPoint::Create,
                Self::Read(_) => EntryPoint::Read,
                Self::Update(_) => EntryPoint::Update,
                Self::Delete(_) => EntryPoint::Delete,
                Self::Analyze(_) => EntryPoint::Analyze,
                Self::Intelligence(_) => EntryPoint::Intelligence,
                Self::Transfer(_) => EntryPoint::Transfer,
                Self::Tasks(_) => EntryPoint::Tasks,
                Self::System(_) => EntryPoint::System,
            }
        }

        pub fn as_str(self) -> &'static str {
            match self {
                Self::Create(op) => op.as_str(),
                Self::Read(op) => op.as_str(),
                Self::Update(op) => op.as_str(),
                Self::Delete(op) => op.as_str(),
                Self::Analyze(op) => op.as_str(),
                Self::Intelligence(op) => op.as_str(),
                Self::Transfer(op) => op.as_str(),
                Self::Tasks(op) => op.as_str(),
                Self::System(op) => op.as_str(),
            }
        }

        /// Every operation of one entry point, in declaration order.
        pub fn all_for(entry_point: EntryPoint) -> Vec<Self> {
            match entry_point {
                EntryPoint::Create => CreateOp::ALL.iter().copied().map(Self::Create).collect(),
                EntryPoint::Read => ReadOp::ALL.iter().copied().map(Self::Read).collect(),
                EntryPoint::Update => UpdateOp::ALL.iter().copied().map(Self::Update).collect(),
                EntryPoint::Delete => DeleteOp::ALL.iter().copied().map(Self::Delete).collect(),
                EntryPoint::Analyze => AnalyzeOp::ALL.iter().copied().map(Self::Analyze).collect(),
                EntryPoint::Intelligence => IntelligenceOp::ALL
                    .iter()
                    .copied()
                    .map(Self::Intelligence)
                    .collect(),
                EntryPoint::Transfer => {
                    TransferOp::ALL.iter().copied().map(Self::Transfer).collect()
                }
                EntryPoint::Tasks => TasksOp::ALL.iter().copied().map(Self::Tasks).collect(),
                EntryPoint::System => SystemOp::ALL.iter().copied().map(Self::System).collect(),
            }
        }
    }

    impl std::fmt::Display for Operation {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}.{}", self.entry_point().as_str(), self.as_str())
        }
    }

    /// Value carried in the `operation` field of bulk payloads.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub enum BulkKind {
        Store,
        Update,
        Delete,
    }

    impl BulkKind {
        pub const ALL: [BulkKind; 3] = [Self::Store, Self::Update, Self::Delete];

        pub fn as_str(self) -> &'static str {
            match self {
                Self::Store => "store",
                Self::Update => "update",
                Self::Delete => "delete",
            }
        }

        pub fn parse(raw: &str) -> Option<Self> {
            match raw {
                "store" => Some(Self::Store),
                "update" => Some(Self::Update),
                "delete" => Some(Self::Delete),
                _ => None,
            }
        }
    }
}
