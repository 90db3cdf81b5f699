use std::sync::Arc;

use crate::config::AppConfig;
use crate::functions::Registry;
use crate::rpc::session::SessionSet;
use crate::rpc::shutdown::Shutdown;
use crate::rpc::supervisor::ActivityClock;

/// Aggregate server state shared by the listener, every session and the
/// idle supervisor.
#[derive(Clone)]
pub struct ServerContext {
    pub config: Arc<AppConfig>,
    pub registry: Arc<Registry>,
    pub clock: ActivityClock,
    pub sessions: SessionSet,
    pub shutdown: Shutdown,
}

impl ServerContext {
    pub fn new(config: AppConfig, registry: Registry) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            clock: ActivityClock::new(),
            sessions: SessionSet::new(),
            shutdown: Shutdown::new(),
        }
    }
}
