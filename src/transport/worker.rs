//! Background thread driving periodic flushes.
//!
//! The worker sleeps on its command channel with a timeout equal to the flush
//! interval. A timeout triggers a flush; a shutdown command or a dropped
//! sender ends the loop. Stopping the timer joins the thread, so once
//! [`FlushTimer::stop`] returns no timer-driven flush is running or can start.

use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use log::{debug, warn};

use super::batch_transport::TransportCore;

/// Commands processed by the timer thread.
#[derive(Debug)]
pub(super) enum TimerCommand {
    Shutdown,
}

/// Handle to a running flush timer.
pub(super) struct FlushTimer {
    tx: Sender<TimerCommand>,
    handle: JoinHandle<()>,
}

impl FlushTimer {
    /// Spawn a timer that flushes `core` every `interval`.
    pub(super) fn spawn(core: Arc<TransportCore>, interval: Duration) -> io::Result<Self> {
        let (tx, rx) = bounded(1);
        let handle = thread::Builder::new()
            .name("gt8004-flush".into())
            .spawn(move || timer_loop(&rx, &core, interval))?;
        Ok(Self { tx, handle })
    }

    /// Cancel the timer and wait for an in-flight flush to finish.
    pub(super) fn stop(self) {
        // A full or disconnected channel means the thread is already exiting.
        let _ = self.tx.try_send(TimerCommand::Shutdown);
        if self.handle.join().is_err() {
            warn!("GT8004 flush timer thread panicked");
        }
    }
}

fn timer_loop(rx: &Receiver<TimerCommand>, core: &TransportCore, interval: Duration) {
    debug!("GT8004 flush timer started with interval {interval:?}");
    loop {
        match rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                if core.is_closed() {
                    break;
                }
                core.flush();
            }
            Ok(TimerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("GT8004 flush timer stopped");
}
