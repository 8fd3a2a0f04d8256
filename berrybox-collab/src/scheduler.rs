use std::{sync::Arc, time::Duration};

use berrybox_core::PrimaryKey;
use crossbeam::atomic::AtomicCell;
use dashmap::DashMap;
use log::debug;
use tokio::{
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

pub type JobSender = UnboundedSender<TransitionJob>;
pub type JobReceiver = UnboundedReceiver<TransitionJob>;

/// A request to naturally transition a box, sent when its timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionJob {
    pub box_id: PrimaryKey,
    /// The generation of the timer that fired
    pub generation: u64,
}

struct ArmedTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Keeps at most one pending transition timer per box.
///
/// Arming a timer aborts the previous one for the same box. A job can still be in
/// flight when that happens, so receivers must check [TransitionScheduler::is_current].
#[derive(Clone)]
pub struct TransitionScheduler {
    timers: Arc<DashMap<PrimaryKey, ArmedTimer>>,
    generation: Arc<AtomicCell<u64>>,
    job_sender: JobSender,
}

impl TransitionScheduler {
    pub fn new() -> (Self, JobReceiver) {
        let (job_sender, job_receiver) = unbounded_channel();

        let scheduler = Self {
            timers: Default::default(),
            generation: Default::default(),
            job_sender,
        };

        (scheduler, job_receiver)
    }

    /// Schedules a transition of the box after the delay, replacing any armed timer.
    /// Must be called within a tokio runtime.
    pub fn arm(&self, box_id: PrimaryKey, delay: Duration) -> u64 {
        let generation = self.generation.fetch_add(1) + 1;
        let sender = self.job_sender.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sender.send(TransitionJob { box_id, generation }).ok();
        });

        let previous = self
            .timers
            .insert(box_id, ArmedTimer { generation, handle });

        if let Some(previous) = previous {
            previous.handle.abort();
        }

        debug!(
            "Armed timer {} for box {} in {:.1}s",
            generation,
            box_id,
            delay.as_secs_f32()
        );

        generation
    }

    /// Cancels the armed timer of the box, if any
    pub fn cancel(&self, box_id: PrimaryKey) {
        if let Some((_, timer)) = self.timers.remove(&box_id) {
            timer.handle.abort();
            debug!("Cancelled timer {} for box {}", timer.generation, box_id);
        }
    }

    pub fn is_armed(&self, box_id: PrimaryKey) -> bool {
        self.timers.contains_key(&box_id)
    }

    /// Returns true if the job comes from the timer that is currently armed for its box
    pub fn is_current(&self, job: &TransitionJob) -> bool {
        self.timers
            .get(&job.box_id)
            .map(|t| t.generation == job.generation)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn test_rearming_replaces_timer() {
        let (scheduler, mut jobs) = TransitionScheduler::new();

        let first = scheduler.arm(1, Duration::from_millis(30));
        let second = scheduler.arm(1, Duration::from_millis(60));
        assert_ne!(first, second);

        let job = timeout(Duration::from_secs(1), jobs.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(job.generation, second);
        assert!(scheduler.is_current(&job));

        // The aborted timer never fires
        let late = timeout(Duration::from_millis(100), jobs.recv()).await;
        assert!(late.is_err());
    }

    #[tokio::test]
    async fn test_cancel() {
        let (scheduler, mut jobs) = TransitionScheduler::new();

        let generation = scheduler.arm(7, Duration::from_millis(20));
        scheduler.cancel(7);

        assert!(!scheduler.is_armed(7));
        assert!(!scheduler.is_current(&TransitionJob {
            box_id: 7,
            generation
        }));

        let late = timeout(Duration::from_millis(80), jobs.recv()).await;
        assert!(late.is_err());
    }

    #[tokio::test]
    async fn test_boxes_are_independent() {
        let (scheduler, mut jobs) = TransitionScheduler::new();

        scheduler.arm(1, Duration::ZERO);
        scheduler.arm(2, Duration::ZERO);

        let mut boxes = vec![];
        for _ in 0..2 {
            let job = timeout(Duration::from_secs(1), jobs.recv())
                .await
                .unwrap()
                .unwrap();
            boxes.push(job.box_id);
        }

        boxes.sort();
        assert_eq!(boxes, vec![1, 2]);
    }
}
