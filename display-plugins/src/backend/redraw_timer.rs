use std::sync::mpsc::channel;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::mpsc::Sender;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

// While throttled only every Nth tick requests a render
const THROTTLE_DIVISOR: u64 = 4;

/// Requests redraws at a fixed interval from a background thread.
pub struct RedrawTimer {
    sender: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl RedrawTimer {
    pub fn start<T, F>(interval: Duration, is_throttled: T, on_tick: F) -> RedrawTimer
    where
        T: Fn() -> bool + Send + 'static,
        F: Fn() + Send + 'static,
    {
        let (sender, receiver) = channel::<()>();
        let thread = thread::Builder::new()
            .name("RedrawTimer".into())
            .spawn(move || {
                let mut ticks: u64 = 0;
                loop {
                    match receiver.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {},
                        // Stopped
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    ticks += 1;
                    if is_throttled() && ticks % THROTTLE_DIVISOR != 0 {
                        continue;
                    }
                    on_tick();
                }
                debug!("Redraw timer stopped after {} ticks", ticks);
            });
        let thread = match thread {
            Ok(thread) => Some(thread),
            Err(err) => {
                error!("Failed to start redraw timer ({})", err);
                None
            },
        };
        RedrawTimer {
            sender: Some(sender),
            thread,
        }
    }

    /// Stops the timer and waits for its thread. No tick runs afterwards.
    pub fn stop(&mut self) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Redraw timer thread panicked");
            }
        }
    }
}

impl Drop for RedrawTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
