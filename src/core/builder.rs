use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::engine::{Engine, TokioEngine};
use super::monitor::{HostProbe, UnforkedHostProbe};
use super::runtime::AppRuntime;
use crate::{
    config::Config,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing an [`AppRuntime`] with optional features.
pub struct AppRuntimeBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    engine: Option<Arc<dyn Engine>>,
    probe: Option<Arc<dyn HostProbe>>,
    shutdown: Option<CancellationToken>,
}

impl AppRuntimeBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            engine: None,
            probe: None,
            shutdown: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers are called inline on the publishing thread and must return quickly.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the task engine that runs the root computation.
    pub fn with_engine(mut self, engine: Arc<dyn Engine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Replaces the unforked-host probe (used when `Config::detect_unforked_host` is set).
    pub fn with_probe(mut self, probe: Arc<dyn HostProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Uses `token` as an additional exit hook trigger.
    ///
    /// Cancelling it behaves like a termination signal.
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    /// Builds the runtime. Nothing is provisioned until [`AppRuntime::run`].
    pub fn build(self) -> AppRuntime {
        let subs = Arc::new(SubscriberSet::new(self.subscribers));
        let bus = Bus::new(self.cfg.bus_capacity_clamped(), subs);
        let probe = self
            .probe
            .unwrap_or_else(|| Arc::new(UnforkedHostProbe::from_config(&self.cfg)));

        AppRuntime::new_internal(
            self.cfg,
            bus,
            self.engine.unwrap_or_else(|| Arc::new(TokioEngine)),
            probe,
            self.shutdown.unwrap_or_default(),
        )
    }
}
