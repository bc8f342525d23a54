//! Spoken announcements.
//!
//! `Speaker` drives espeak-ng as a subprocess from a single worker thread
//! fed by a queue. `say` enqueues and returns immediately; utterances are
//! serialized by the single consumer, so a slow one delays the next but
//! nothing overlaps inside the engine. `stop` is idempotent and permanent
//! for the process lifetime: it closes the queue, makes a best-effort kill
//! of the in-flight utterance, and turns later `say` calls into no-ops.

use std::process::{Child, Command};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Seam between the pipeline and the speech engine. Tests substitute a
/// recording sink.
pub trait SpeechSink: Send + Sync {
    /// Enqueue text for asynchronous delivery. No-op after `stop`.
    fn say(&self, text: &str);

    /// Permanently stop speech output. Idempotent.
    fn stop(&self);
}

pub struct Speaker {
    tx: Mutex<Option<Sender<String>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stopped: Arc<AtomicBool>,
    current: Arc<Mutex<Option<Child>>>,
}

impl Speaker {
    pub fn new(tts_rate: u32) -> Self {
        let (tx, rx) = mpsc::channel::<String>();
        let stopped = Arc::new(AtomicBool::new(false));
        let current = Arc::new(Mutex::new(None::<Child>));

        let worker_stopped = stopped.clone();
        let worker_current = current.clone();
        let worker = std::thread::spawn(move || {
            for text in rx {
                if worker_stopped.load(Ordering::SeqCst) {
                    break;
                }
                speak_blocking(&text, tts_rate, &worker_current);
            }
        });

        Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            stopped,
            current,
        }
    }
}

impl SpeechSink for Speaker {
    fn say(&self, text: &str) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        if let Ok(guard) = self.tx.lock() {
            if let Some(tx) = guard.as_ref() {
                // A send failure means the worker is gone; nothing to do.
                let _ = tx.send(text.to_string());
            }
        }
    }

    fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        // Closing the channel ends the worker loop after the current item.
        if let Ok(mut guard) = self.tx.lock() {
            guard.take();
        }
        // Best-effort interrupt of the in-flight utterance.
        if let Ok(mut guard) = self.current.lock() {
            if let Some(child) = guard.as_mut() {
                let _ = child.kill();
            }
        }
        if let Ok(mut guard) = self.worker.lock() {
            if let Some(handle) = guard.take() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for Speaker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run one utterance to completion. Engine failures are logged and
/// swallowed; speech must never take the pipeline down.
fn speak_blocking(text: &str, tts_rate: u32, current: &Mutex<Option<Child>>) {
    let child = Command::new("espeak-ng")
        .arg("-s")
        .arg(tts_rate.to_string())
        .arg(text)
        .spawn();
    let child = match child {
        Ok(child) => child,
        Err(err) => {
            log::warn!("failed to start espeak-ng: {}", err);
            return;
        }
    };

    if let Ok(mut guard) = current.lock() {
        *guard = Some(child);
    } else {
        return;
    }

    // Wait outside the lock so stop() can reach the child to kill it.
    loop {
        let status = {
            let Ok(mut guard) = current.lock() else {
                return;
            };
            let Some(child) = guard.as_mut() else {
                return;
            };
            child.try_wait()
        };
        match status {
            Ok(Some(status)) => {
                if !status.success() {
                    log::warn!("espeak-ng exited with {}", status);
                }
                break;
            }
            Ok(None) => std::thread::sleep(std::time::Duration::from_millis(10)),
            Err(err) => {
                log::warn!("waiting on espeak-ng failed: {}", err);
                break;
            }
        }
    }

    if let Ok(mut guard) = current.lock() {
        guard.take();
    }
}
