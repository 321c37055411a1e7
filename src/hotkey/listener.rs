//! Dedicated OS-thread hotkey listener using `rdev::listen`.
//!
//! `rdev::listen` is a blocking call that must live on its own OS thread.
//! [`HotkeyListener`] owns that thread and a stop flag; dropping it sets the
//! flag so the callback silently ignores further events.
//!
//! # Shutdown caveat
//!
//! `rdev::listen` has **no graceful shutdown API**.  Setting the stop flag
//! prevents events from being forwarded, but the OS thread itself will remain
//! blocked in the rdev event loop until the process exits.  rdev holds no
//! resources that need explicit cleanup.

use std::io;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::mpsc;

use super::{ControlSignal, HotkeyBindings, KeyFilter};

// ---------------------------------------------------------------------------
// HotkeyListener
// ---------------------------------------------------------------------------

/// Handle to a running hotkey listener thread.
///
/// Construct one with [`HotkeyListener::start`].  Drop it to stop forwarding
/// events.
pub struct HotkeyListener {
    /// Shared stop flag, set `true` on [`Drop`].
    stop: Arc<AtomicBool>,
    /// Never joined: `rdev::listen` does not return.
    _thread: std::thread::JoinHandle<()>,
}

impl HotkeyListener {
    /// Spawn a dedicated OS thread that listens for global key events and
    /// forwards one [`ControlSignal`] per physical press of a bound key.
    ///
    /// The thread uses `try_send`: the rdev callback runs inside the OS
    /// event hook, and blocking it would stall keyboard input system-wide.
    /// A signal that does not fit in the channel is dropped with a warning.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the OS refuses to create the thread.
    pub fn start(bindings: HotkeyBindings, tx: mpsc::Sender<ControlSignal>) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                let mut filter = KeyFilter::default();

                let result = rdev::listen(move |event| {
                    if stop_clone.load(Ordering::Relaxed) {
                        return;
                    }

                    match event.event_type {
                        rdev::EventType::KeyPress(key) => {
                            let Some(signal) = bindings.signal_for(key) else {
                                return;
                            };
                            if let Some(signal) = filter.press(signal) {
                                log::debug!("hotkey: {}", signal.label());
                                if let Err(e) = tx.try_send(signal) {
                                    log::warn!("hotkey: dropped {} ({e})", signal.label());
                                }
                            }
                        }
                        rdev::EventType::KeyRelease(key) => {
                            if let Some(signal) = bindings.signal_for(key) {
                                filter.release(signal);
                            }
                        }
                        _ => {}
                    }
                });

                if let Err(e) = result {
                    log::error!("hotkey-listener: rdev::listen exited with error: {:?}", e);
                }
            })?;

        Ok(Self {
            stop,
            _thread: thread,
        })
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
