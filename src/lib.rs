pub mod config;
pub mod console;
pub mod context;
pub mod functions;
pub mod logging;
pub mod rpc;
