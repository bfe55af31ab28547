use tokio::sync::watch;

use crate::types::ScanStatus;

/// Owner of the one [`ScanStatus`] value.
///
/// Only the scanner holds this handle, so every write goes through it. Readers
/// get clones or a `watch::Receiver`; a slow reader never holds up the pass.
#[derive(Debug)]
pub struct StatusCell {
    tx: watch::Sender<ScanStatus>,
}

impl StatusCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ScanStatus { message: "Idle".to_string(), ..Default::default() });
        Self { tx }
    }

    pub fn snapshot(&self) -> ScanStatus {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanStatus> {
        self.tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.tx.borrow().running
    }

    /// Flips `running` on and resets the counters. Returns false if a pass is
    /// already running; check and set happen under the channel's write lock.
    pub fn try_begin(&self) -> bool {
        self.tx.send_if_modified(|s| {
            if s.running {
                return false;
            }
            *s = ScanStatus { running: true, message: "Starting scan...".to_string(), ..Default::default() };
            true
        })
    }

    pub fn update<F: FnOnce(&mut ScanStatus)>(&self, f: F) {
        self.tx.send_modify(f);
    }

    pub fn set_message(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|s| s.message = message);
    }

    pub fn finish(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|s| {
            s.running = false;
            s.message = message;
        });
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}
