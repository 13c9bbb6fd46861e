//! Attention-line forwarding for simulator-backed subcommands.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use touchwire_core::Engine;
use touchwire_sim::{SimBus, SimHandle};

/// Background thread turning simulator attention into engine reads, the
/// way an interrupt handler thread drives real hardware. Joins on drop.
pub struct AttentionPump {
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl AttentionPump {
    pub fn start(engine: &Arc<Engine<SimBus>>, handle: &SimHandle) -> Self {
        let engine = Arc::clone(engine);
        let handle = handle.clone();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_seen = Arc::clone(&stop);
        let thread = thread::spawn(move || {
            while !stop_seen.load(Ordering::Relaxed) {
                if handle.wait_attention(Duration::from_millis(5)) {
                    let _ = engine.read_message();
                }
            }
        });
        Self {
            stop,
            thread: Some(thread),
        }
    }
}

impl Drop for AttentionPump {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
