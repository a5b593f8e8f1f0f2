//! Notification sound hook.
//!
//! Playback is fire-and-forget: a failing backend is logged and never
//! surfaced. The actual audio output lives outside the core, so the default
//! implementation only records that a sound was requested.

use tracing::debug;

/// Sink for the "new message" notification sound.
pub trait Notifier: Send + Sync {
    fn notify(&self);
}

/// Default notifier for the headless client.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self) {
        debug!("Notification sound requested");
    }
}
