use super::engine::Engine;

type Job = Box<dyn FnOnce(&mut Engine) + Send>;

/// Results of background work waiting to run on the engine thread.
///
/// Drained once per iteration, before event dispatch. Draining takes only
/// what was queued when it started, so a job that posts another job
/// cannot stall the loop.
pub struct HandoffQueue {
    tx: flume::Sender<Job>,
    rx: flume::Receiver<Job>,
}

impl HandoffQueue {
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> HandoffSender {
        HandoffSender {
            tx: self.tx.clone(),
        }
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Jobs queued so far. Never blocks.
    pub(crate) fn take_ready(&self) -> Vec<Job> {
        let ready = self.rx.len();
        self.rx.try_iter().take(ready).collect()
    }
}

impl Default for HandoffQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Posts jobs to an engine from any thread.
#[derive(Clone)]
pub struct HandoffSender {
    tx: flume::Sender<Job>,
}

impl HandoffSender {
    /// Queues `job` for the next iteration. Returns false once the engine
    /// is gone.
    pub fn post<F>(&self, job: F) -> bool
    where
        F: FnOnce(&mut Engine) + Send + 'static,
    {
        self.tx.send(Box::new(job)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_ready_only_returns_what_was_queued() {
        let queue = HandoffQueue::new();
        let sender = queue.sender();
        assert!(sender.post(|_| {}));
        assert!(sender.post(|_| {}));
        assert_eq!(queue.pending(), 2);

        let ready = queue.take_ready();
        assert_eq!(ready.len(), 2);
        assert_eq!(queue.pending(), 0);
        assert!(queue.take_ready().is_empty());
    }

    #[test]
    fn post_fails_after_queue_is_dropped() {
        let queue = HandoffQueue::new();
        let sender = queue.sender();
        drop(queue);
        assert!(!sender.post(|_| {}));
    }
}
