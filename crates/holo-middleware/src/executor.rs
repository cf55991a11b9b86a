//! Middleware executor — central chain dispatch.
//!
//! Thread-safe with interior locking: registration takes a short write
//! lock, `execute` snapshots the applicable chain under a read lock and
//! awaits with no lock held.

use crate::{DispatchContext, Middleware, MiddlewareAction, MiddlewareError, MiddlewarePhase};
use holo_types::MiddlewareId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A registered middleware with metadata and execution counters.
struct RegisteredMiddleware {
    id: MiddlewareId,
    middleware: Arc<dyn Middleware>,
    enabled: AtomicBool,
    executions: AtomicU64,
    total_micros: AtomicU64,
}

impl RegisteredMiddleware {
    fn record_execution(&self, elapsed_micros: u64) {
        self.executions.fetch_add(1, Ordering::Relaxed);
        self.total_micros.fetch_add(elapsed_micros, Ordering::Relaxed);
    }
}

/// Execution statistics for one registration.
#[derive(Debug, Clone)]
pub struct MiddlewareStats {
    /// Registration id.
    pub id: MiddlewareId,
    /// Middleware name.
    pub name: String,
    /// Phase the middleware is registered in.
    pub phase: MiddlewarePhase,
    /// Times executed (successful or not).
    pub executions: u64,
    /// Rolling average latency in milliseconds.
    pub average_ms: f64,
}

/// Result of a completed (non-failing) chain run.
#[derive(Debug)]
pub struct ChainOutcome {
    /// The context as left by the last middleware to run.
    pub context: DispatchContext,
    /// How many middlewares executed.
    pub executed: usize,
    /// `true` if the chain was short-circuited by `Halt` or
    /// `stop_propagation`.
    pub halted: bool,
}

/// Central registry and runner for all middlewares.
///
/// Middlewares are indexed by [`MiddlewarePhase`]; within each phase they
/// are kept sorted by priority (descending), stable for equal priorities.
pub struct MiddlewareExecutor {
    chains: RwLock<HashMap<MiddlewarePhase, Vec<Arc<RegisteredMiddleware>>>>,
}

impl MiddlewareExecutor {
    /// Creates an empty executor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chains: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a middleware. Returns the registration id.
    ///
    /// Inserted in priority order (descending, FIFO for ties) into the
    /// middleware's declared phase.
    pub fn register(&self, middleware: Arc<dyn Middleware>) -> MiddlewareId {
        let id = MiddlewareId::new();
        let phase = middleware.phase();
        let priority = middleware.priority();

        let registered = Arc::new(RegisteredMiddleware {
            id,
            middleware,
            enabled: AtomicBool::new(true),
            executions: AtomicU64::new(0),
            total_micros: AtomicU64::new(0),
        });

        let mut chains = self.chains.write();
        let entry = chains.entry(phase).or_default();
        let pos = entry
            .iter()
            .position(|r| r.middleware.priority() < priority)
            .unwrap_or(entry.len());
        entry.insert(pos, registered);

        id
    }

    /// Unregisters a middleware by id. Returns `true` if found.
    pub fn unregister(&self, id: MiddlewareId) -> bool {
        let mut chains = self.chains.write();
        let mut found = false;
        chains.retain(|_, registrations| {
            let before = registrations.len();
            registrations.retain(|r| r.id != id);
            found |= registrations.len() < before;
            !registrations.is_empty()
        });
        found
    }

    /// Enables or disables a registration. Returns `true` if found.
    ///
    /// Disabled middlewares are skipped during selection but keep their
    /// registration (and statistics).
    pub fn set_enabled(&self, id: MiddlewareId, enabled: bool) -> bool {
        let chains = self.chains.read();
        for registrations in chains.values() {
            if let Some(r) = registrations.iter().find(|r| r.id == id) {
                r.enabled.store(enabled, Ordering::Relaxed);
                return true;
            }
        }
        false
    }

    /// Returns the number of registered middlewares across all phases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.read().values().map(Vec::len).sum()
    }

    /// Returns `true` if no middlewares are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns per-registration execution statistics.
    #[must_use]
    pub fn stats(&self) -> Vec<MiddlewareStats> {
        let chains = self.chains.read();
        let mut out = Vec::new();
        for (phase, registrations) in chains.iter() {
            for r in registrations {
                let executions = r.executions.load(Ordering::Relaxed);
                let total = r.total_micros.load(Ordering::Relaxed);
                out.push(MiddlewareStats {
                    id: r.id,
                    name: r.middleware.name().to_string(),
                    phase: *phase,
                    executions,
                    average_ms: if executions == 0 {
                        0.0
                    } else {
                        total as f64 / executions as f64 / 1000.0
                    },
                });
            }
        }
        out
    }

    /// Executes the chain for a phase.
    ///
    /// Selection: enabled registrations of the phase whose
    /// `applies(ctx)` holds, in priority-descending order. The chain is
    /// advanced by the executor based on each returned
    /// [`MiddlewareAction`]; `Halt` or a set `stop_propagation` flag
    /// short-circuits the remainder.
    ///
    /// # Errors
    ///
    /// [`MiddlewareError`] when a middleware fails or times out. The
    /// error phase has already run (with the triggering error attached
    /// to the context) before the error is returned — unless the failing
    /// phase was itself [`MiddlewarePhase::Error`], which never recurses.
    pub async fn execute(
        &self,
        phase: MiddlewarePhase,
        ctx: DispatchContext,
    ) -> Result<ChainOutcome, MiddlewareError> {
        match self.run_chain(phase, ctx).await {
            Ok(outcome) => Ok(outcome),
            Err((err, failed_ctx)) => {
                // A failure inside the error phase itself is only
                // logged — the error chain never re-enters itself.
                if !phase.is_error() {
                    tracing::warn!(
                        event = %failed_ctx.event,
                        phase = %phase,
                        error = %err,
                        "middleware chain failed, running error phase"
                    );
                    let error_ctx = failed_ctx.with_error(err.to_string());
                    if let Err((error_phase_err, _)) =
                        self.run_chain(MiddlewarePhase::Error, error_ctx).await
                    {
                        tracing::warn!(
                            error = %error_phase_err,
                            "error-phase middleware failed"
                        );
                    }
                }
                Err(err)
            }
        }
    }

    /// Runs one phase's chain without error-phase handling.
    ///
    /// On failure returns the error together with the context as it
    /// stood when the failing middleware ran, so the error phase sees
    /// the state the failure saw.
    async fn run_chain(
        &self,
        phase: MiddlewarePhase,
        ctx: DispatchContext,
    ) -> Result<ChainOutcome, (MiddlewareError, DispatchContext)> {
        // Snapshot the chain so no lock is held across awaits and
        // mid-chain (un)registration cannot affect the in-flight run.
        let selected: Vec<Arc<RegisteredMiddleware>> = {
            let chains = self.chains.read();
            chains
                .get(&phase)
                .map(|registrations| {
                    registrations
                        .iter()
                        .filter(|r| r.enabled.load(Ordering::Relaxed))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut current = ctx;
        current.phase = phase;
        let mut executed = 0;
        let mut halted = false;

        for registration in selected {
            if !registration.middleware.applies(&current) {
                continue;
            }

            let name = registration.middleware.name().to_string();
            let started = Instant::now();
            let work = registration.middleware.handle(current.clone());
            let outcome = match registration.middleware.timeout() {
                Some(limit) => match tokio::time::timeout(limit, work).await {
                    Ok(action) => Ok(action),
                    Err(_) => Err(MiddlewareError::Timeout {
                        middleware: name.clone(),
                        timeout_ms: limit.as_millis() as u64,
                    }),
                },
                None => Ok(work.await),
            };
            registration.record_execution(started.elapsed().as_micros() as u64);
            executed += 1;

            let action = match outcome {
                Ok(action) => action,
                Err(err) => return Err((err, current)),
            };

            match action {
                MiddlewareAction::Continue(next) => {
                    current = *next;
                    if current.stop_propagation {
                        halted = true;
                        break;
                    }
                }
                MiddlewareAction::Halt => {
                    halted = true;
                    break;
                }
                MiddlewareAction::Fail(message) => {
                    let err = MiddlewareError::Failed {
                        middleware: name,
                        message,
                    };
                    return Err((err, current));
                }
            }
        }

        Ok(ChainOutcome {
            context: current,
            executed,
            halted,
        })
    }
}

impl Default for MiddlewareExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MiddlewareExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareExecutor")
            .field("registered", &self.len())
            .finish()
    }
}
