//! Observability sink for engine activity.
//!
//! The engine reports what it does through an [`EngineObserver`] instead of
//! rendering anything itself. Hosts plug in whatever they need (a debug
//! overlay, counters, a log); [`NullObserver`] ignores everything and
//! [`LogObserver`] forwards to the `log` facade.

use std::sync::Arc;

use fog_map_ledger_models::{RejectReason, VisitMode};

/// Something the engine did.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A sample was appended.
    Admitted {
        /// Ledger the sample went to.
        mode: VisitMode,
        /// Ledger length after the append.
        len: usize,
    },
    /// A sample was dropped by the admission policy.
    Rejected {
        /// Ledger the sample was offered to.
        mode: VisitMode,
        /// Why it was dropped.
        reason: RejectReason,
    },
    /// A ledger was emptied.
    Cleared {
        /// Ledger that was cleared.
        mode: VisitMode,
        /// Epoch after the clear.
        epoch: u64,
    },
    /// Coverage was recomputed (cache hits are not reported).
    CoverageComputed {
        /// Region name.
        region: String,
        /// Ledger the coverage was computed from.
        mode: VisitMode,
        /// Result in percent.
        percent: f64,
    },
    /// Writing or deleting the persisted ledger failed.
    FlushFailed {
        /// Rendered error.
        message: String,
    },
}

/// Receives [`EngineEvent`]s.
///
/// Implementations must be `Send + Sync`; events are delivered from
/// whichever thread triggered them, including blocking worker threads.
pub trait EngineObserver: Send + Sync {
    /// Called once per event.
    fn on_event(&self, event: &EngineEvent);
}

/// Ignores every event.
pub struct NullObserver;

impl EngineObserver for NullObserver {
    fn on_event(&self, _event: &EngineEvent) {}
}

/// Writes every event to the `log` facade.
pub struct LogObserver;

impl EngineObserver for LogObserver {
    fn on_event(&self, event: &EngineEvent) {
        match event {
            EngineEvent::Admitted { mode, len } => {
                log::debug!("Admitted {mode} sample, ledger now {len} points");
            }
            EngineEvent::Rejected { mode, reason } => {
                log::trace!("Rejected {mode} sample: {reason}");
            }
            EngineEvent::Cleared { mode, epoch } => {
                log::info!("Cleared {mode} ledger (epoch {epoch})");
            }
            EngineEvent::CoverageComputed {
                region,
                mode,
                percent,
            } => {
                log::debug!("{region} {mode} coverage: {percent:.2}%");
            }
            EngineEvent::FlushFailed { message } => {
                log::warn!("Persistence failure: {message}");
            }
        }
    }
}

/// Returns a shared [`NullObserver`].
#[must_use]
pub fn null_observer() -> Arc<dyn EngineObserver> {
    Arc::new(NullObserver)
}
