use crate::actors::messages::ThreadCommand;
use crate::actors::thread_actor::{thread_actor, ThreadContext};
use crate::error::ServiceError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

pub(crate) type ThreadMap = Arc<Mutex<HashMap<String, UnboundedSender<ThreadCommand>>>>;

pub(crate) fn lock_threads(
    threads: &ThreadMap,
) -> MutexGuard<'_, HashMap<String, UnboundedSender<ThreadCommand>>> {
    threads.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Routes commands to the actor owning each thread, spawning actors on demand
#[derive(Clone)]
pub struct ThreadRegistry {
    context: Arc<ThreadContext>,
    threads: ThreadMap,
}

impl ThreadRegistry {
    pub fn new(context: ThreadContext) -> Self {
        Self {
            context: Arc::new(context),
            threads: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn context(&self) -> &ThreadContext {
        &self.context
    }

    /// Queue a command on the thread's actor.
    /// Sending happens under the registry lock so an actor can retire safely.
    pub fn dispatch(&self, thread_id: &str, command: ThreadCommand) -> Result<(), ServiceError> {
        let mut threads = lock_threads(&self.threads);

        let command = match threads.get(thread_id) {
            Some(sender) => match sender.send(command) {
                Ok(()) => return Ok(()),
                Err(e) => e.0,
            },
            None => command,
        };

        let (sender, receiver) = unbounded_channel();
        tokio::spawn(thread_actor(
            thread_id.to_string(),
            receiver,
            self.context.clone(),
            self.threads.clone(),
        ));
        sender
            .send(command)
            .map_err(|_| ServiceError::Unavailable(thread_id.to_string()))?;
        threads.insert(thread_id.to_string(), sender);

        tracing::debug!("[ThreadRegistry] Spawned actor for thread '{}'", thread_id);
        Ok(())
    }

    /// Number of live thread actors
    pub fn active_threads(&self) -> usize {
        lock_threads(&self.threads).len()
    }
}
