//! Cancellable pacing timers
//!
//! Each scheduled tick belongs to the current timer group. Cancelling the
//! group (on node change, widget close, or reset) aborts every pending
//! tick at once; the sequence number guards against any tick that slips
//! through the race.

use crate::state_machine::Event;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub struct Pacer {
    group: CancellationToken,
}

impl Pacer {
    pub fn new() -> Self {
        Self {
            group: CancellationToken::new(),
        }
    }

    /// Fire a `PacerElapsed { seq }` back into the event channel after
    /// `delay`, unless the group is cancelled first.
    pub fn schedule(&self, delay: Duration, seq: u64, event_tx: mpsc::Sender<Event>) {
        let token = self.group.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let _ = event_tx.send(Event::PacerElapsed { seq }).await;
                }
            }
        });
    }

    /// Abort every pending tick and start a new group.
    pub fn cancel_all(&mut self) {
        self.group.cancel();
        self.group = CancellationToken::new();
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn scheduled_tick_fires_after_delay() {
        let (tx, mut rx) = mpsc::channel(4);
        let pacer = Pacer::new();
        pacer.schedule(Duration::from_millis(300), 7, tx);

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(rx.recv().await, Some(Event::PacerElapsed { seq: 7 }));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_silences_pending_ticks() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut pacer = Pacer::new();
        pacer.schedule(Duration::from_millis(100), 1, tx.clone());
        pacer.schedule(Duration::from_millis(200), 2, tx.clone());
        pacer.cancel_all();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());

        // A new group schedules normally after cancellation.
        pacer.schedule(Duration::from_millis(50), 3, tx);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(rx.recv().await, Some(Event::PacerElapsed { seq: 3 }));
    }
}
