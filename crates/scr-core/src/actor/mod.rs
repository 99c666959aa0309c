//! # SCR Core Serializing Actor
//!
//! Every lifecycle transition of every holder runs on one worker task that
//! consumes an unbounded queue in submission order. Producers (module
//! listeners, reference trackers, administrative callers) enqueue through a
//! cloneable [`ActorHandle`] and never block.
//!
//! Each task runs to completion before the next one starts, so a holder
//! never observes two of its transitions at once. A panicking task is
//! contained and logged; the worker carries on with the next task.
pub mod error;

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::holder::{ComponentHolder, DeactivationReason, DependencyChange, LifecycleError};
use crate::registry::ComponentId;
use crate::service::ServiceObject;

pub use error::ActorError;

/// Future returned by a [`Job`]
pub type JobFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Arbitrary work serialized with the lifecycle tasks
pub type Job = Box<dyn FnOnce() -> JobFuture + Send>;

/// Unit of work executed by the actor
pub enum LifecycleTask {
    Enable(Arc<ComponentHolder>),
    Disable {
        holder: Arc<ComponentHolder>,
        reason: DeactivationReason,
    },
    DependencyChanged {
        holder: Arc<ComponentHolder>,
        change: DependencyChange,
    },
    Dispose {
        holder: Arc<ComponentHolder>,
        reason: DeactivationReason,
    },
    /// Activate a delayed component and hand out its instance
    Activate {
        holder: Arc<ComponentHolder>,
        reply: oneshot::Sender<Result<ServiceObject, LifecycleError>>,
    },
    NewInstance {
        holder: Arc<ComponentHolder>,
        properties: BTreeMap<String, serde_json::Value>,
        reply: oneshot::Sender<Result<ComponentId, LifecycleError>>,
    },
    DisposeInstance {
        holder: Arc<ComponentHolder>,
        id: ComponentId,
        reply: oneshot::Sender<Result<(), LifecycleError>>,
    },
    Job {
        name: String,
        job: Job,
    },
    /// Barrier: replies once every task submitted before it has run
    Flush(oneshot::Sender<()>),
}

impl LifecycleTask {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleTask::Enable(_) => "enable",
            LifecycleTask::Disable { .. } => "disable",
            LifecycleTask::DependencyChanged { .. } => "dependency-changed",
            LifecycleTask::Dispose { .. } => "dispose",
            LifecycleTask::Activate { .. } => "activate",
            LifecycleTask::NewInstance { .. } => "new-instance",
            LifecycleTask::DisposeInstance { .. } => "dispose-instance",
            LifecycleTask::Job { .. } => "job",
            LifecycleTask::Flush(_) => "flush",
        }
    }

    /// Build a job task from an async closure
    pub fn job<F, Fut>(name: &str, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        LifecycleTask::Job {
            name: name.to_string(),
            job: Box::new(move || Box::pin(f()) as JobFuture),
        }
    }

    fn target(&self) -> Option<&str> {
        match self {
            LifecycleTask::Enable(holder)
            | LifecycleTask::Disable { holder, .. }
            | LifecycleTask::DependencyChanged { holder, .. }
            | LifecycleTask::Dispose { holder, .. }
            | LifecycleTask::Activate { holder, .. }
            | LifecycleTask::NewInstance { holder, .. }
            | LifecycleTask::DisposeInstance { holder, .. } => Some(holder.name()),
            LifecycleTask::Job { name, .. } => Some(name),
            LifecycleTask::Flush(_) => None,
        }
    }

    async fn run(self) {
        match self {
            LifecycleTask::Enable(holder) => holder.enable().await,
            LifecycleTask::Disable { holder, reason } => holder.disable(reason).await,
            LifecycleTask::DependencyChanged { holder, change } => holder.dependency_changed(change).await,
            LifecycleTask::Dispose { holder, reason } => holder.dispose(reason).await,
            LifecycleTask::Activate { holder, reply } => {
                let _ = reply.send(holder.request_instance().await);
            }
            LifecycleTask::NewInstance {
                holder,
                properties,
                reply,
            } => {
                let _ = reply.send(holder.new_instance(properties).await);
            }
            LifecycleTask::DisposeInstance { holder, id, reply } => {
                let _ = reply.send(holder.dispose_instance(id).await);
            }
            LifecycleTask::Job { job, .. } => job().await,
            LifecycleTask::Flush(reply) => {
                let _ = reply.send(());
            }
        }
    }
}

impl fmt::Debug for LifecycleTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleTask")
            .field("task", &self.name())
            .field("target", &self.target())
            .finish()
    }
}

enum Envelope {
    Task(LifecycleTask),
    Stop,
}

struct Shared {
    accepting: AtomicBool,
    /// Set by a non-draining terminate: queued tasks are dropped unrun
    discarding: AtomicBool,
    pending: AtomicUsize,
}

/// Cloneable submission side of the actor
#[derive(Clone)]
pub struct ActorHandle {
    sender: mpsc::UnboundedSender<Envelope>,
    shared: Arc<Shared>,
}

impl ActorHandle {
    /// Enqueue `task` without waiting for it to run
    pub fn submit(&self, task: LifecycleTask) -> Result<(), ActorError> {
        if !self.shared.accepting.load(Ordering::Acquire) {
            return Err(ActorError::Terminated);
        }
        self.shared.pending.fetch_add(1, Ordering::AcqRel);
        if self.sender.send(Envelope::Task(task)).is_err() {
            self.shared.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(ActorError::Terminated);
        }
        Ok(())
    }

    /// Enqueue a task carrying a reply channel and wait for its answer
    pub async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> LifecycleTask,
    ) -> Result<T, ActorError> {
        let (reply, response) = oneshot::channel();
        let task = build(reply);
        let name = task.name();
        self.submit(task)?;
        response.await.map_err(|_| ActorError::ReplyDropped(name))
    }

    /// Wait until every task submitted before this call has run
    pub async fn flush(&self) -> Result<(), ActorError> {
        self.request(LifecycleTask::Flush).await
    }

    /// Wait until the queue is empty, including tasks enqueued by the tasks
    /// that ran meanwhile. Must not be awaited from inside a task.
    pub async fn settle(&self) -> Result<(), ActorError> {
        loop {
            self.flush().await?;
            if self.pending() == 0 {
                return Ok(());
            }
        }
    }

    /// Tasks submitted but not yet finished
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }

    pub fn is_accepting(&self) -> bool {
        self.shared.accepting.load(Ordering::Acquire)
    }
}

impl fmt::Debug for ActorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorHandle")
            .field("accepting", &self.is_accepting())
            .field("pending", &self.pending())
            .finish()
    }
}

/// Owner of the worker task
pub struct SerializingActor {
    handle: ActorHandle,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SerializingActor {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            accepting: AtomicBool::new(true),
            discarding: AtomicBool::new(false),
            pending: AtomicUsize::new(0),
        });
        let worker = tokio::spawn(Self::work(receiver, shared.clone()));
        log::debug!("Lifecycle actor started");
        Self {
            handle: ActorHandle { sender, shared },
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn handle(&self) -> ActorHandle {
        self.handle.clone()
    }

    /// Stop accepting tasks, then run (`drain`) or drop the queued ones and
    /// wait for the worker to exit. Calling it again is a no-op.
    pub async fn terminate(&self, drain: bool) -> Result<(), ActorError> {
        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(worker) = worker else {
            return Ok(());
        };
        self.handle.shared.accepting.store(false, Ordering::Release);
        self.handle.shared.discarding.store(!drain, Ordering::Release);
        if self.handle.sender.send(Envelope::Stop).is_err() {
            log::warn!("Lifecycle actor exited before termination was requested");
        }
        if let Err(e) = worker.await {
            log::error!("Lifecycle actor worker failed: {}", e);
        }
        log::debug!("Lifecycle actor terminated (drain: {})", drain);
        Ok(())
    }

    async fn work(mut receiver: mpsc::UnboundedReceiver<Envelope>, shared: Arc<Shared>) {
        let mut discarded = 0usize;
        while let Some(envelope) = receiver.recv().await {
            match envelope {
                Envelope::Task(task) if shared.discarding.load(Ordering::Acquire) => {
                    drop(task);
                    discarded += 1;
                    shared.pending.fetch_sub(1, Ordering::AcqRel);
                }
                Envelope::Task(task) => Self::execute(task, &shared).await,
                // Refuse further sends and run out what is already queued
                Envelope::Stop => receiver.close(),
            }
        }
        if discarded > 0 {
            log::info!("Lifecycle actor discarded {} queued task(s)", discarded);
        }
    }

    async fn execute(task: LifecycleTask, shared: &Shared) {
        let name = task.name();
        let target = task.target().map(str::to_string);
        if let LifecycleTask::Flush(reply) = task {
            shared.pending.fetch_sub(1, Ordering::AcqRel);
            let _ = reply.send(());
            return;
        }
        log::trace!("Running task '{}' for {:?}", name, target);
        // Run on its own task so a panicking hook cannot take the worker down
        if let Err(e) = tokio::spawn(task.run()).await {
            log::error!(
                "[{}] Lifecycle task '{}' panicked: {}",
                target.unwrap_or_default(),
                name,
                e
            );
        }
        shared.pending.fetch_sub(1, Ordering::AcqRel);
    }
}

impl fmt::Debug for SerializingActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializingActor")
            .field("handle", &self.handle)
            .finish()
    }
}
