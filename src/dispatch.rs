//! Per-user message dispatch
//!
//! Every user with recent traffic has a worker task that handles their
//! messages strictly in arrival order. Different users' workers run
//! concurrently. A worker that sits idle closes its channel, finishes
//! whatever is already queued, and exits; the next message for that
//! user spawns a fresh one. Each user has one lane lock that a worker
//! holds for its whole life, so a fresh worker waits for a draining one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::SendError, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::chat::{ChatTransport, Inbound, UserId};
use crate::conversation::Conversation;
use crate::images::ImageGenerator;

struct Worker {
    tx: UnboundedSender<Inbound>,
    lane: Arc<Mutex<()>>,
}

impl Worker {
    /// True once the task has exited and released the lane
    fn is_finished(&self) -> bool {
        self.tx.is_closed() && Arc::strong_count(&self.lane) == 1
    }
}

/// Routes inbound messages to per-user workers
pub struct Dispatcher<T, G> {
    conversation: Arc<Conversation<T, G>>,
    workers: HashMap<UserId, Worker>,
    idle_timeout: Duration,
}

impl<T, G> Dispatcher<T, G>
where
    T: ChatTransport + 'static,
    G: ImageGenerator + 'static,
{
    pub fn new(conversation: Arc<Conversation<T, G>>, idle_timeout: Duration) -> Self {
        Self {
            conversation,
            workers: HashMap::new(),
            idle_timeout,
        }
    }

    /// Queue a message on its user's worker, spawning one if needed
    pub fn dispatch(&mut self, inbound: Inbound) {
        let user_id = inbound.user_id;

        let (inbound, lane) = match self.workers.get(&user_id) {
            Some(worker) => match worker.tx.send(inbound) {
                Ok(()) => return,
                // Worker went idle and closed; hand the message to a new one
                // on the same lane
                Err(SendError(inbound)) => (inbound, worker.lane.clone()),
            },
            None => (inbound, Arc::new(Mutex::new(()))),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(inbound);
        self.workers.insert(
            user_id,
            Worker {
                tx,
                lane: lane.clone(),
            },
        );

        debug!("Spawning worker for user {}", user_id);
        tokio::spawn(run_worker(
            self.conversation.clone(),
            user_id,
            lane,
            rx,
            self.idle_timeout,
        ));
    }

    /// Forget workers that have exited
    pub fn prune(&mut self) {
        self.workers.retain(|_, worker| !worker.is_finished());
    }

    pub fn active_workers(&self) -> usize {
        self.workers.len()
    }
}

async fn run_worker<T, G>(
    conversation: Arc<Conversation<T, G>>,
    user_id: UserId,
    lane: Arc<Mutex<()>>,
    mut rx: UnboundedReceiver<Inbound>,
    idle_timeout: Duration,
) where
    T: ChatTransport,
    G: ImageGenerator,
{
    let _lane = lane.lock_owned().await;
    loop {
        match tokio::time::timeout(idle_timeout, rx.recv()).await {
            Ok(Some(inbound)) => process(&conversation, inbound).await,
            Ok(None) => break,
            Err(_) => {
                rx.close();
                while let Ok(inbound) = rx.try_recv() {
                    process(&conversation, inbound).await;
                }
                break;
            }
        }
    }
    debug!("Worker for user {} exited", user_id);
}

async fn process<T, G>(conversation: &Conversation<T, G>, inbound: Inbound)
where
    T: ChatTransport,
    G: ImageGenerator,
{
    let user_id = inbound.user_id;
    match conversation.handle(inbound).await {
        Ok(step) => debug!("User {} step: {:?}", user_id, step),
        Err(e) => error!("Conversation step for user {} failed: {}", user_id, e),
    }
}
