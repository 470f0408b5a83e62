#![forbid(unsafe_code)]

use super::{Binding, HandlerId, binding_for};
use crate::legacy::{LegacySurface, RegisterError};
use mg_core::entry::EntryPoint;
use mg_core::ops::Operation;
use mg_core::routes::{TableError, legacy_tools, validate_legacy_table};

#[derive(Debug, thiserror::Error)]
pub(crate) enum CatalogError {
    #[error("legacy table: {0}")]
    Table(#[from] TableError),
    #[error(transparent)]
    Register(#[from] RegisterError),
}

#[derive(Clone, Debug)]
pub(crate) struct EntryPointDescriptor {
    pub(crate) entry_point: EntryPoint,
    pub(crate) operations: Vec<(Operation, Binding)>,
}

impl EntryPointDescriptor {
    fn new(entry_point: EntryPoint) -> Self {
        let operations = Operation::all_for(entry_point)
            .into_iter()
            .map(|op| (op, binding_for(op)))
            .collect();
        Self {
            entry_point,
            operations,
        }
    }

    pub(crate) fn operation_names(&self) -> Vec<&'static str> {
        self.operations.iter().map(|(op, _)| op.as_str()).collect()
    }
}

/// Consolidated descriptors plus the legacy surface. Built once, read-only afterwards.
#[derive(Clone, Debug)]
pub(crate) struct Catalog {
    entry_points: Vec<EntryPointDescriptor>,
    legacy: LegacySurface,
}

impl Catalog {
    pub(crate) fn build(with_legacy: bool) -> Result<Self, CatalogError> {
        let entry_points = EntryPoint::ALL
            .into_iter()
            .map(EntryPointDescriptor::new)
            .collect();

        validate_legacy_table(legacy_tools())?;
        let mut legacy = LegacySurface::default();
        if with_legacy {
            for tool in legacy_tools() {
                legacy.register(tool)?;
            }
        }

        Ok(Self {
            entry_points,
            legacy,
        })
    }

    pub(crate) fn entry_points(&self) -> &[EntryPointDescriptor] {
        &self.entry_points
    }

    pub(crate) fn legacy(&self) -> &LegacySurface {
        &self.legacy
    }

    /// Handlers the consolidated surface can reach, deduplicated.
    pub(crate) fn bound_handlers(&self) -> Vec<HandlerId> {
        let mut out: Vec<HandlerId> = self
            .entry_points
            .iter()
            .flat_map(|descriptor| descriptor.operations.iter())
            .filter_map(|(_, binding)| match binding {
                Binding::Direct(id) => Some(*id),
                Binding::Bulk(_) => Some(HandlerId::BulkOperation),
                Binding::Placeholder => None,
            })
            .collect();
        out.sort();
        out.dedup();
        out
    }
}
