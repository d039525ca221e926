//! ProcessSupervisor (C13): a cleanup-hook registry plus signal-triggered
//! graceful shutdown (spec §4.12).
//!
//! Grounded on the teacher's `server/src/main.rs` shutdown pattern
//! (`tokio::select!` over `ctrl_c`/SIGTERM, `axum::serve`'s
//! `with_graceful_shutdown`), generalized from "stop accepting HTTP
//! connections" to "run an arbitrary ordered list of cleanup hooks under
//! a bounded timeout."

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{error, info, warn};

/// Default bound on total cleanup time before a forced exit (spec §4.12).
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// The kind of resource a cleanup hook releases, carried only for
/// logging — the supervisor treats every kind identically at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    ServerSocket,
    Timer,
    FileHandle,
    WebSocket,
    Named,
}

type CleanupFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type CleanupAction = Box<dyn FnOnce() -> CleanupFuture + Send>;

struct CleanupHook {
    name: String,
    kind: ResourceKind,
    action: CleanupAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
    UncaughtPanic,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every cleanup hook ran to completion within the timeout.
    Completed,
    /// The timeout elapsed before all hooks finished; the caller should
    /// exit forcibly with code 1.
    TimedOut,
}

/// Registers cleanup hooks and runs them, in registration order, when a
/// termination signal (or an explicit `shutdown()` call) fires.
pub struct ProcessSupervisor {
    hooks: Mutex<Vec<CleanupHook>>,
    timeout: Duration,
}

impl ProcessSupervisor {
    pub fn new(timeout: Duration) -> Self {
        Self { hooks: Mutex::new(Vec::new()), timeout }
    }

    pub fn register_cleanup<F, Fut>(&self, name: impl Into<String>, kind: ResourceKind, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let action: CleanupAction = Box::new(move || Box::pin(hook()));
        self.hooks.lock().push(CleanupHook { name: name.into(), kind, action });
    }

    /// Waits for SIGINT or SIGTERM, then runs `shutdown()`. Returns the
    /// reason the shutdown fired plus the outcome.
    pub async fn run_until_signal(&self) -> (ShutdownReason, ShutdownOutcome) {
        let reason = wait_for_signal().await;
        let outcome = self.shutdown().await;
        (reason, outcome)
    }

    /// Runs every registered hook, in order, under `self.timeout`.
    /// Hooks that themselves hang do not block hooks registered after
    /// them from the caller's perspective only in the sense that the
    /// whole batch shares one deadline; a hung hook still blocks the
    /// ones queued behind it since they run sequentially, matching the
    /// teacher's single in-order `with_graceful_shutdown` future.
    pub async fn shutdown(&self) -> ShutdownOutcome {
        let hooks = std::mem::take(&mut *self.hooks.lock());
        let run_all = async {
            for hook in hooks {
                info!(name = %hook.name, kind = ?hook.kind, "running cleanup hook");
                (hook.action)().await;
            }
        };

        match tokio::time::timeout(self.timeout, run_all).await {
            Ok(()) => {
                info!("graceful shutdown complete");
                ShutdownOutcome::Completed
            }
            Err(_) => {
                error!(timeout = ?self.timeout, "shutdown timed out, forcing exit");
                ShutdownOutcome::TimedOut
            }
        }
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.lock().len()
    }
}

/// Waits for Ctrl+C or SIGTERM (Unix only; on other platforms, only
/// Ctrl+C is observable), mirroring the teacher's `shutdown_signal`.
pub async fn wait_for_signal() -> ShutdownReason {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("received interrupt, initiating graceful shutdown");
            ShutdownReason::Interrupt
        }
        _ = terminate => {
            warn!("received terminate, initiating graceful shutdown");
            ShutdownReason::Terminate
        }
    }
}

/// Installs a panic hook that logs the panic and routes it through
/// `supervisor.shutdown()` before the default hook runs, per spec §4.12
/// "uncaught exceptions... route through the same shutdown when
/// configured." Rust has no unhandled-promise-rejection analogue; a
/// panicked spawned task is the closest equivalent and is handled by the
/// caller checking `JoinHandle` results, not by this hook.
pub fn install_panic_shutdown_hook(supervisor: std::sync::Arc<ProcessSupervisor>) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        error!(panic = %info, "uncaught panic, triggering supervisor shutdown");
        default_hook(info);
        let supervisor = supervisor.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                supervisor.shutdown().await;
                std::process::exit(1);
            });
        } else {
            std::process::exit(1);
        }
    }));
}
