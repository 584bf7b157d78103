pub mod client;
pub mod reconciler;
pub mod scheduler;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ScalerClient, ScalerSource};
pub use reconciler::{clamp_backlog, reconcile, Reconciled, SyncState};
pub use scheduler::{FrameReceiver, PollScheduler, SchedulerSettings, SchedulerState};
pub use session::{CycleOutcome, Liveness, RealtimeSession};
