//! Interrupt handling
//!
//! The handlers are registered by `install`, before the watcher starts, so a signal
//! arriving while the initial snapshot runs is not lost.

use std::io;

/// Which signal ended the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Interrupt,
    Terminate,
}

/// Registered interrupt/terminate handlers
pub struct ShutdownSignal {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    /// Register handlers; must be called inside the runtime
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Block until the process is asked to stop
    #[cfg(unix)]
    pub async fn wait(mut self) -> Shutdown {
        tokio::select! {
            _ = self.interrupt.recv() => Shutdown::Interrupt,
            _ = self.terminate.recv() => Shutdown::Terminate,
        }
    }

    #[cfg(not(unix))]
    pub async fn wait(self) -> Shutdown {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Shutdown::Interrupt,
            Err(e) => {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                Shutdown::Terminate
            }
        }
    }
}
