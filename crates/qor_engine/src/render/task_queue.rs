//! Graphics task queue
//!
//! Only the thread that owns the graphics context (the *handler*, recorded
//! when the queue is created) may call into the backend. Other threads hand
//! work over as closures:
//!
//! - [`GraphicsTaskQueue::enqueue`] is fire-and-forget
//! - [`GraphicsTaskQueue::run_and_wait`] blocks until the handler has run
//!   the closure and returns its result
//!
//! Tasks are pushed at the front and drained from the back, so they run in
//! submission order.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

use crate::render::backend::GraphicsBackend;

type Task = Box<dyn FnOnce(&mut dyn GraphicsBackend) + Send>;

/// Errors from [`GraphicsTaskQueue::run_and_wait`]
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskError {
    /// Called on the handler thread, which would wait on itself
    #[error("run_and_wait called on the graphics handler thread")]
    WouldDeadlock,

    /// The queue was dropped before the task ran
    #[error("graphics task was dropped before it ran")]
    Abandoned,
}

/// Cross-thread hand-off of graphics work to the context thread
pub struct GraphicsTaskQueue {
    tasks: Mutex<VecDeque<Task>>,
    handler: ThreadId,
}

impl std::fmt::Debug for GraphicsTaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsTaskQueue")
            .field("pending", &self.pending())
            .field("handler", &self.handler)
            .finish()
    }
}

impl GraphicsTaskQueue {
    /// Create a queue whose handler is the calling thread
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(VecDeque::new()),
            handler: thread::current().id(),
        }
    }

    /// True on the thread allowed to drain the queue
    pub fn is_handler(&self) -> bool {
        thread::current().id() == self.handler
    }

    /// Queue a task without waiting for it
    pub fn enqueue(&self, task: impl FnOnce(&mut dyn GraphicsBackend) + Send + 'static) {
        self.tasks.lock().push_front(Box::new(task));
    }

    /// Queue a task and block until the handler has run it.
    ///
    /// Returns [`TaskError::WouldDeadlock`] immediately on the handler
    /// thread, and [`TaskError::Abandoned`] if the task is dropped unrun.
    pub fn run_and_wait<R, F>(&self, task: F) -> Result<R, TaskError>
    where
        R: Send + 'static,
        F: FnOnce(&mut dyn GraphicsBackend) -> R + Send + 'static,
    {
        if self.is_handler() {
            return Err(TaskError::WouldDeadlock);
        }

        let completion = Arc::new(Completion::new());
        let promise = Promise(Some(Arc::clone(&completion)));
        self.enqueue(move |backend| promise.fulfill(task(backend)));

        completion.wait()
    }

    /// Run every queued task, oldest first, on the handler thread.
    ///
    /// Returns the number of tasks run. Tasks queued while draining run in
    /// the same call. From any other thread this does nothing and returns 0.
    pub fn drain(&self, backend: &mut dyn GraphicsBackend) -> usize {
        if !self.is_handler() {
            log::warn!("graphics task queue drained from a non-handler thread; ignoring");
            return 0;
        }

        let mut count = 0;
        loop {
            // lock released before the task runs so tasks can enqueue
            let task = self.tasks.lock().pop_back();
            let Some(task) = task else {
                break;
            };
            task(backend);
            count += 1;
        }
        if count > 0 {
            log::trace!("ran {count} queued graphics tasks");
        }
        count
    }

    /// Number of queued tasks
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }

    /// True when nothing is queued
    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

impl Default for GraphicsTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

enum Slot<R> {
    Pending,
    Done(R),
    Abandoned,
}

struct Completion<R> {
    slot: Mutex<Slot<R>>,
    ready: Condvar,
}

impl<R> Completion<R> {
    fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending),
            ready: Condvar::new(),
        }
    }

    fn settle(&self, value: Slot<R>) {
        *self.slot.lock() = value;
        self.ready.notify_all();
    }

    fn wait(&self) -> Result<R, TaskError> {
        let mut slot = self.slot.lock();
        loop {
            match std::mem::replace(&mut *slot, Slot::Pending) {
                Slot::Pending => self.ready.wait(&mut slot),
                Slot::Done(value) => return Ok(value),
                Slot::Abandoned => return Err(TaskError::Abandoned),
            }
        }
    }
}

/// Write side of a [`Completion`]; marks it abandoned if dropped unfulfilled
struct Promise<R>(Option<Arc<Completion<R>>>);

impl<R> Promise<R> {
    fn fulfill(mut self, value: R) {
        if let Some(completion) = self.0.take() {
            completion.settle(Slot::Done(value));
        }
    }
}

impl<R> Drop for Promise<R> {
    fn drop(&mut self) {
        if let Some(completion) = self.0.take() {
            completion.settle(Slot::Abandoned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::{GraphicsCommand, HeadlessBackend};

    #[test]
    fn test_drain_runs_in_submission_order() {
        let queue = GraphicsTaskQueue::new();
        let mut backend = HeadlessBackend::new();
        let log = backend.log();

        queue.enqueue(|b| b.active_texture(1));
        queue.enqueue(|b| b.active_texture(2));
        queue.enqueue(|b| b.active_texture(3));
        assert_eq!(queue.pending(), 3);

        assert_eq!(queue.drain(&mut backend), 3);
        assert!(queue.is_empty());
        assert_eq!(
            log.commands(),
            vec![
                GraphicsCommand::ActiveTexture(1),
                GraphicsCommand::ActiveTexture(2),
                GraphicsCommand::ActiveTexture(3),
            ]
        );
    }

    #[test]
    fn test_drain_refused_off_handler_thread() {
        let queue = Arc::new(GraphicsTaskQueue::new());
        queue.enqueue(|b| b.set_blend(true));

        let remote = Arc::clone(&queue);
        let ran = thread::spawn(move || {
            let mut backend = HeadlessBackend::new();
            (remote.is_handler(), remote.drain(&mut backend))
        })
        .join()
        .unwrap();

        assert_eq!(ran, (false, 0));
        assert!(queue.is_handler());
        assert_eq!(queue.pending(), 1);
    }

    #[test]
    fn test_run_and_wait_on_handler_fails_fast() {
        let queue = GraphicsTaskQueue::new();
        let result = queue.run_and_wait(|_| 5);
        assert_eq!(result, Err(TaskError::WouldDeadlock));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_run_and_wait_round_trip() {
        let queue = Arc::new(GraphicsTaskQueue::new());
        let mut backend = HeadlessBackend::new();

        let remote = Arc::clone(&queue);
        let worker = thread::spawn(move || remote.run_and_wait(|b| b.create_vertex_array()));

        // keep draining until the worker's task has been delivered
        while !worker.is_finished() {
            queue.drain(&mut backend);
            thread::yield_now();
        }
        let handle = worker.join().unwrap().unwrap();
        assert_ne!(handle.0, 0);
    }

    #[test]
    fn test_dropped_queue_abandons_waiters() {
        let queue = Arc::new(GraphicsTaskQueue::new());
        let remote = Arc::clone(&queue);
        let worker = thread::spawn(move || remote.run_and_wait(|_| ()));

        while queue.is_empty() {
            thread::yield_now();
        }
        drop(queue.tasks.lock().pop_back());

        assert_eq!(worker.join().unwrap(), Err(TaskError::Abandoned));
    }
}
