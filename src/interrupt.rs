//! Operator interrupt (Ctrl-C) as a shared flag.
//!
//! Once the listener is installed SIGINT no longer kills the process. yt-dlp
//! shares our process group, so it still receives the signal and exits; the
//! extractor then sees the flag and reports an interrupt instead of a failure.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use anyhow::{Context, Result};
use tokio::runtime::Builder;
use tokio::signal;

#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Spawns a background thread that sets the flag on every Ctrl-C.
    pub fn listen_for_ctrl_c(&self) -> Result<()> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("building signal runtime")?;
        let interrupt = self.clone();

        thread::Builder::new()
            .name("ctrl-c".into())
            .spawn(move || {
                runtime.block_on(async move {
                    loop {
                        if let Err(err) = signal::ctrl_c().await {
                            log::warn!("failed to listen for ctrl+c: {err}");
                            break;
                        }
                        log::debug!("ctrl+c received");
                        interrupt.trigger();
                    }
                });
            })
            .context("spawning signal listener")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let interrupt = Interrupt::new();
        let handle = interrupt.clone();
        assert!(!handle.is_triggered());
        interrupt.trigger();
        assert!(handle.is_triggered());
    }
}
