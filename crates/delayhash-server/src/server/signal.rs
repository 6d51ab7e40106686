//! OS interrupt handling.
//!
//! Every delivered signal is forwarded to
//! [`ShutdownCoordinator::interrupt`](delayhash::ShutdownCoordinator::interrupt):
//! the first starts a graceful drain, the next one escalates.

use delayhash::{InterruptAction, SharedShutdown};
use futures::{Stream, StreamExt};

/// Installed interrupt handlers: SIGINT, SIGTERM, SIGHUP and SIGQUIT on unix,
/// Ctrl+C elsewhere.
#[cfg(unix)]
pub struct Interrupts {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
    quit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Interrupts {
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
            quit: signal(SignalKind::quit())?,
        })
    }

    /// Waits for the next signal and returns its name.
    pub async fn recv(&mut self) -> Option<&'static str> {
        tokio::select! {
            Some(()) = self.interrupt.recv() => Some("SIGINT"),
            Some(()) = self.terminate.recv() => Some("SIGTERM"),
            Some(()) = self.hangup.recv() => Some("SIGHUP"),
            Some(()) = self.quit.recv() => Some("SIGQUIT"),
            else => None,
        }
    }
}

#[cfg(not(unix))]
pub struct Interrupts;

#[cfg(not(unix))]
impl Interrupts {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self)
    }

    pub async fn recv(&mut self) -> Option<&'static str> {
        tokio::signal::ctrl_c().await.ok().map(|()| "Ctrl+C")
    }
}

impl Interrupts {
    pub fn into_stream(self) -> impl Stream<Item = &'static str> + Send {
        futures::stream::unfold(self, |mut interrupts| async move {
            interrupts.recv().await.map(|name| (name, interrupts))
        })
    }
}

/// Forwards signals to the coordinator until one escalates or the source
/// ends. Returns the action taken for the last signal seen.
pub async fn forward_interrupts<S>(
    signals: S,
    shutdown: SharedShutdown,
) -> Option<InterruptAction>
where
    S: Stream<Item = &'static str>,
{
    let mut signals = std::pin::pin!(signals);
    let mut last = None;

    while let Some(name) = signals.next().await {
        tracing::info!(signal = name, "Received signal");
        let action = shutdown.interrupt();
        last = Some(action);
        if action == InterruptAction::Escalate {
            break;
        }
    }
    last
}
