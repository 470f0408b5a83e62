#![forbid(unsafe_code)]

mod calls;
mod lifecycle;

#[cfg(test)]
mod tests;

#[cfg(test)]
pub(crate) fn test_server() -> crate::McpServer {
    use crate::dispatch::{Catalog, Dispatcher};
    use std::sync::Arc;

    let store = mg_storage::SqliteStore::open_in_memory().expect("in-memory store");
    let catalog = Catalog::build(true).expect("catalog");
    let registry = crate::handlers::reference_registry(store);
    crate::McpServer::new(Dispatcher::new(Arc::new(catalog), Arc::new(registry)), None)
}
