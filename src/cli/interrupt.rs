use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::debug;

/// Routes Ctrl-C for the lifetime of the REPL.
///
/// While a reply is being revealed an interrupt skips to its end; otherwise
/// it asks the REPL to quit.
#[derive(Debug, Clone, Default)]
pub struct Interrupts {
    reveal: Arc<Mutex<Option<CancellationToken>>>,
    quit: CancellationToken,
}

impl Interrupts {
    /// Installs the one SIGINT listener of the process.
    pub fn listen() -> Self {
        let interrupts = Self::default();
        let routed = interrupts.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                routed.interrupt();
            }
        });
        interrupts
    }

    fn slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.reveal.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn interrupt(&self) {
        match self.slot().take() {
            Some(token) => {
                debug!("Interrupt: skipping reveal");
                token.cancel();
            }
            None => {
                debug!("Interrupt: quitting");
                self.quit.cancel();
            }
        }
    }

    /// Token cancelled by the next interrupt, until [`Interrupts::end_reveal`].
    pub fn begin_reveal(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.slot() = Some(token.clone());
        token
    }

    pub fn end_reveal(&self) {
        self.slot().take();
    }

    pub fn is_quitting(&self) -> bool {
        self.quit.is_cancelled()
    }

    pub fn quit_requested(&self) -> WaitForCancellationFuture<'_> {
        self.quit.cancelled()
    }
}
