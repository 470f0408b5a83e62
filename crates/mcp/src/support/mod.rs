#![forbid(unsafe_code)]

mod args;
mod ids;
mod jsonrpc;
mod logging;
mod runtime;
mod time;

pub(crate) use args::*;
pub(crate) use ids::*;
pub(crate) use jsonrpc::*;
pub(crate) use logging::*;
pub(crate) use runtime::*;
pub(crate) use time::*;
