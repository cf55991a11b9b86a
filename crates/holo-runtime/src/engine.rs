//! The shell engine.

use crate::{EngineConfig, EngineError};
use holo_bus::EventBus;
use holo_event::ShellEvent;
use holo_lifecycle::{
    EventProcessor, LifecycleManager, LifecycleStore, Phase, PhaseRecorder, ProcessError, Status,
    SubmitOptions,
};
use holo_middleware::{DispatchContext, MiddlewareExecutor, MiddlewarePhase};
use holo_types::RecordId;
use serde_json::{json, Value};
use std::sync::Arc;

/// Result of one dispatch through the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct DispatchReport {
    /// Listeners the bus fan-out reached.
    pub delivered: usize,
    /// `true` if a before-middleware suppressed the fan-out.
    pub suppressed: bool,
}

/// Builder for [`ShellEngine`].
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    store: Option<Arc<dyn LifecycleStore>>,
}

impl EngineBuilder {
    /// Sets the engine configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the lifecycle persistence store. Recovery runs during
    /// [`build`](Self::build).
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn LifecycleStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds and starts the engine.
    ///
    /// Runs lifecycle recovery (when a store is configured), installs
    /// the dispatch pipeline as the lifecycle processor, and spawns the
    /// drive loop and cleanup sweeper.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Lifecycle`] if recovery cannot list the
    /// store's keys. Per-record recovery failures are contained and
    /// logged, not surfaced here.
    pub async fn build(self) -> Result<ShellEngine, EngineError> {
        let bus = EventBus::new(self.config.bus);
        let middlewares = Arc::new(MiddlewareExecutor::new());
        let lifecycle = match self.store {
            Some(store) => LifecycleManager::with_store(self.config.lifecycle.clone(), store),
            None => LifecycleManager::new(self.config.lifecycle.clone()),
        };

        let recovery = lifecycle.recover().await?;
        if recovery.restored > 0 {
            tracing::info!(restored = recovery.restored, "resuming tracked work");
        }

        lifecycle.set_processor(Arc::new(PipelineProcessor {
            bus: bus.clone(),
            middlewares: Arc::clone(&middlewares),
        }));

        // Failed or timed-out tracked work becomes an observable error
        // event on the same bus instead of a silent terminal record.
        let error_bus = bus.clone();
        lifecycle.set_on_terminal(move |record| {
            if matches!(record.status, Status::Failed | Status::Timeout) {
                error_bus.emit(&ShellEvent::custom(
                    "lifecycle:error",
                    json!({
                        "record": record.id.to_string(),
                        "event": record.event,
                        "status": record.status.to_string(),
                        "error": record.error,
                    }),
                ));
            }
        });

        let driver = lifecycle.spawn_driver();
        let sweeper = lifecycle.spawn_sweeper();

        Ok(ShellEngine {
            bus,
            middlewares,
            lifecycle,
            source: self.config.source,
            driver,
            sweeper,
        })
    }
}

/// The shell's event core: one bus, one middleware executor, one
/// lifecycle manager, behind an explicit start/shutdown lifecycle.
///
/// Built via [`ShellEngine::builder`]; subsystems receive `&ShellEngine`
/// (or a clone of [`bus()`](Self::bus)) from the embedding shell rather
/// than reaching into shared global state.
pub struct ShellEngine {
    bus: EventBus,
    middlewares: Arc<MiddlewareExecutor>,
    lifecycle: LifecycleManager,
    source: String,
    driver: tokio::task::JoinHandle<()>,
    sweeper: tokio::task::JoinHandle<()>,
}

impl ShellEngine {
    /// Returns a builder with default configuration.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The engine's event bus.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The engine's middleware executor.
    #[must_use]
    pub fn middlewares(&self) -> &MiddlewareExecutor {
        &self.middlewares
    }

    /// The engine's lifecycle manager.
    #[must_use]
    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    /// Dispatches an event through the full pipeline:
    /// before-middleware → bus fan-out → after-middleware.
    ///
    /// A `Halt` or `prevent_default` from the before phase suppresses
    /// the fan-out (and the after phase) and reports `suppressed`.
    ///
    /// # Errors
    ///
    /// [`EngineError::Middleware`] when a chain fails or times out; the
    /// error phase has already run by then.
    pub async fn dispatch(
        &self,
        event: ShellEvent,
        source: &str,
    ) -> Result<DispatchReport, EngineError> {
        let ctx = DispatchContext::new(event.name(), event.payload_json(), source);
        let outcome = self.middlewares.execute(MiddlewarePhase::Before, ctx).await?;
        if outcome.halted || outcome.context.prevent_default {
            tracing::debug!(event = event.name(), source, "dispatch suppressed");
            return Ok(DispatchReport {
                delivered: 0,
                suppressed: true,
            });
        }

        let delivered = self.bus.emit(&event);
        self.middlewares
            .execute(MiddlewarePhase::After, outcome.context)
            .await?;
        Ok(DispatchReport {
            delivered,
            suppressed: false,
        })
    }

    /// Submits a lifecycle-tracked dispatch.
    ///
    /// The event is wrapped in a lifecycle record and driven through
    /// the same pipeline as [`dispatch`](Self::dispatch) once its
    /// dependencies (if any) complete — with retry/backoff on failure
    /// and a `lifecycle:error` event on terminal failure.
    ///
    /// # Errors
    ///
    /// [`EngineError::Lifecycle`] for unknown dependencies or a
    /// dependency cycle.
    pub async fn submit_tracked(
        &self,
        event: ShellEvent,
        opts: SubmitOptions,
    ) -> Result<RecordId, EngineError> {
        let payload = match serde_json::to_value(&event) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(event = event.name(), error = %err, "payload snapshot failed");
                Value::Null
            }
        };
        let opts = if opts.source == "shell" {
            opts.with_source(self.source.clone())
        } else {
            opts
        };
        let id = self.lifecycle.submit(event.name(), payload, opts).await?;
        Ok(id)
    }

    /// Stops the drive loop and sweeper, then waits for them to exit.
    pub async fn shutdown(self) {
        self.lifecycle.shutdown();
        let _ = self.driver.await;
        let _ = self.sweeper.await;
    }
}

impl std::fmt::Debug for ShellEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellEngine")
            .field("bus", &self.bus)
            .field("middlewares", &self.middlewares.len())
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}

/// Lifecycle processor running the middleware + bus pipeline.
struct PipelineProcessor {
    bus: EventBus,
    middlewares: Arc<MiddlewareExecutor>,
}

#[async_trait::async_trait]
impl EventProcessor for PipelineProcessor {
    async fn process(
        &self,
        record: holo_lifecycle::LifecycleRecord,
        phases: PhaseRecorder,
    ) -> Result<Value, ProcessError> {
        let event = ShellEvent::from_parts(&record.event, record.payload.clone());

        phases.mark(Phase::Middleware).await;
        let ctx = DispatchContext::new(event.name(), event.payload_json(), &record.source);
        let outcome = self
            .middlewares
            .execute(MiddlewarePhase::Before, ctx)
            .await
            .map_err(|err| ProcessError(err.to_string()))?;
        if outcome.halted || outcome.context.prevent_default {
            return Ok(json!({"delivered": 0, "suppressed": true}));
        }

        phases.mark(Phase::Routing).await;
        let delivered = self.bus.emit(&event);

        phases.mark(Phase::Executing).await;
        self.middlewares
            .execute(MiddlewarePhase::After, outcome.context)
            .await
            .map_err(|err| ProcessError(err.to_string()))?;

        Ok(json!({"delivered": delivered, "suppressed": false}))
    }
}
