use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;

use tracing::{debug, error};

use super::{execute, Backend, Reply, Request};

/// Runs each request on its own thread and hands replies back to the UI
/// thread in arrival order. Requests are neither queued nor deduplicated.
pub struct Worker {
    backend: Arc<dyn Backend>,
    tx: Sender<Reply>,
    rx: Receiver<Reply>,
}

impl Worker {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (tx, rx) = mpsc::channel();
        Worker { backend, tx, rx }
    }

    /// Swaps in a fresh reply channel. Replies to requests dispatched
    /// before this call are dropped.
    pub fn restart(&mut self) {
        let (tx, rx) = mpsc::channel();
        self.tx = tx;
        self.rx = rx;
    }

    pub fn dispatch(&self, request: Request) {
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        debug!(?request, "dispatching");
        thread::spawn(move || {
            let reply = execute(backend.as_ref(), request);
            // The receiver goes away on restart and shutdown.
            if tx.send(reply).is_err() {
                debug!("dropping reply for a closed channel");
            }
        });
    }

    /// Replies that have arrived since the last call, without blocking.
    pub fn drain(&self) -> Vec<Reply> {
        let mut replies = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(reply) => replies.push(reply),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    error!("reply channel disconnected");
                    break;
                }
            }
        }
        replies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;
    use std::time::{Duration, Instant};

    #[test]
    fn replies_come_back_through_drain() {
        let worker = Worker::new(Arc::new(FakeBackend::new()));
        worker.dispatch(Request::Greeting {
            session_id: "fake-session".into(),
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut replies = Vec::new();
        while replies.is_empty() && Instant::now() < deadline {
            replies = worker.drain();
            thread::sleep(Duration::from_millis(5));
        }
        assert!(matches!(replies.as_slice(), [Reply::Greeting(Ok(_))]));
    }

    #[test]
    fn restart_drops_replies_to_earlier_requests() {
        let mut worker = Worker::new(Arc::new(FakeBackend::new()));
        worker.dispatch(Request::NewGame);
        worker.restart();

        thread::sleep(Duration::from_millis(100));
        assert!(worker.drain().is_empty());

        worker.dispatch(Request::NewGame);
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut replies = Vec::new();
        while replies.is_empty() && Instant::now() < deadline {
            replies = worker.drain();
            thread::sleep(Duration::from_millis(5));
        }
        assert!(matches!(replies.as_slice(), [Reply::NewGame(Ok(_))]));
    }

    #[test]
    fn drain_is_empty_without_requests() {
        let worker = Worker::new(Arc::new(FakeBackend::new()));
        assert!(worker.drain().is_empty());
    }
}
