#![forbid(unsafe_code)]

mod dispatch;
mod entry;
mod handlers;
mod legacy;
mod server;
mod support;
mod tools;

pub(crate) use support::*;

use dispatch::{Catalog, Dispatcher, HandlerId};
use entry::run_stdio;
use mg_storage::SqliteStore;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const MCP_VERSION: &str = "2024-11-05";
pub(crate) const SERVER_NAME: &str = "memgate-mcp";
pub(crate) const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub(crate) struct McpServer {
    initialized: bool,
    dispatcher: Dispatcher,
    call_timeout: Option<Duration>,
}

fn usage() -> &'static str {
    "mg_mcp - memory tool gateway (MCP over stdio)\n\n\
USAGE:\n\
  mg_mcp [--storage-dir DIR] [--toolset full|core] [--call-timeout-ms MS] [--log FILTER]\n\
\n\
FLAGS:\n\
  -h, --help       Print this help and exit\n\
  -V, --version    Print version and exit\n\
\n\
ENV:\n\
  MEMGATE_STORAGE_DIR, MEMGATE_TOOLSET, MEMGATE_CALL_TIMEOUT_MS, MEMGATE_LOG\n\
\n\
NOTES:\n\
  - Default store: ./.memgate/memgate.db\n\
  - The core toolset hides the legacy mcp__memory__* names\n"
}

fn version_line() -> String {
    format!("mg_mcp {SERVER_VERSION} protocol={MCP_VERSION}")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = std::env::args().collect::<Vec<_>>();
    if args
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print!("{}", usage());
        return Ok(());
    }
    if args
        .iter()
        .any(|arg| matches!(arg.as_str(), "-V" | "--version"))
    {
        println!("{}", version_line());
        return Ok(());
    }

    init_logging(parse_log_filter().as_deref());

    let storage_dir = parse_storage_dir();
    let toolset = parse_toolset();
    let call_timeout = parse_call_timeout();

    let catalog = Catalog::build(toolset.legacy_enabled())?;
    let store = SqliteStore::open(&storage_dir)?;
    let registry = handlers::reference_registry(store);

    let unwired = catalog
        .bound_handlers()
        .into_iter()
        .filter(|id| !registry.contains(*id))
        .map(HandlerId::as_str)
        .collect::<Vec<_>>();
    tracing::info!(
        storage_dir = %storage_dir.display(),
        toolset = toolset.as_str(),
        consolidated = catalog.entry_points().len(),
        legacy = catalog.legacy().len(),
        handlers = registry.len(),
        call_timeout_ms = ?call_timeout.map(|t| t.as_millis() as u64),
        "{SERVER_NAME} {SERVER_VERSION} starting"
    );
    if !unwired.is_empty() {
        tracing::debug!(handlers = ?unwired, "operations without a handler");
    }

    let dispatcher = Dispatcher::new(Arc::new(catalog), Arc::new(registry));
    let mut server = McpServer::new(dispatcher, call_timeout);
    run_stdio(&mut server)
}
