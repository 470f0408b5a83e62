#![forbid(unsafe_code)]

mod bulk;

pub(crate) use bulk::*;

use mg_core::routes::{LegacyTool, Route, StaticRoute};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// A protocol-visible legacy name and where it forwards.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct LegacyEndpoint {
    pub(crate) name: &'static str,
    pub(crate) description: String,
    pub(crate) route: Route,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum RegisterError {
    #[error("legacy tool {0} is already bound to a different route")]
    Conflict(&'static str),
}

/// Registered legacy endpoints, in registration order.
#[derive(Clone, Debug, Default)]
pub(crate) struct LegacySurface {
    endpoints: Vec<LegacyEndpoint>,
    index: BTreeMap<&'static str, usize>,
}

impl LegacySurface {
    /// Re-registering an identical entry is a no-op.
    pub(crate) fn register(&mut self, tool: &LegacyTool) -> Result<(), RegisterError> {
        if let Some(&slot) = self.index.get(tool.name) {
            if self.endpoints[slot].route == tool.route {
                return Ok(());
            }
            return Err(RegisterError::Conflict(tool.name));
        }
        self.index.insert(tool.name, self.endpoints.len());
        self.endpoints.push(LegacyEndpoint {
            name: tool.name,
            description: tool.description(),
            route: tool.route,
        });
        Ok(())
    }

    pub(crate) fn get(&self, name: &str) -> Option<&LegacyEndpoint> {
        self.index.get(name).map(|&slot| &self.endpoints[slot])
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &LegacyEndpoint> {
        self.endpoints.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.endpoints.len()
    }
}

/// Builds the consolidated arguments for a fixed-route legacy call. `params` become the
/// options verbatim.
pub(crate) fn translate_static(route: &StaticRoute, params: Value) -> Value {
    json!({
        "operation": route.operation.as_str(),
        "scope": route.scope,
        "options": params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mg_core::entry::EntryPoint;
    use mg_core::ops::{Operation, ReadOp};
    use mg_core::routes::{BULK_TOOL, LEGACY_TOOLS};

    fn search_tool() -> LegacyTool {
        *LEGACY_TOOLS
            .iter()
            .find(|tool| tool.name == "mcp__memory__memory_search")
            .expect("search entry")
    }

    #[test]
    fn registering_twice_is_idempotent() {
        let mut surface = LegacySurface::default();
        surface.register(&search_tool()).expect("first");
        surface.register(&search_tool()).expect("second");
        assert_eq!(surface.len(), 1);
    }

    #[test]
    fn rebinding_a_name_is_rejected() {
        let mut surface = LegacySurface::default();
        surface.register(&search_tool()).expect("first");
        let mut moved = search_tool();
        moved.route = BULK_TOOL.route;
        assert_eq!(
            surface.register(&moved),
            Err(RegisterError::Conflict("mcp__memory__memory_search"))
        );
        assert!(matches!(
            surface.get("mcp__memory__memory_search").map(|e| e.route),
            Some(Route::Static(_))
        ));
    }

    #[test]
    fn translation_keeps_params_verbatim() {
        let route = StaticRoute::new(EntryPoint::Read, Operation::Read(ReadOp::Search), "single");
        let params = json!({ "query": "auth", "operation": "ignored-by-static-routes", "x": [1] });
        assert_eq!(
            translate_static(&route, params.clone()),
            json!({ "operation": "search", "scope": "single", "options": params })
        );
    }
}
