// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::any::Any;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use anyhow::Result;
use crossbeam::channel::{unbounded, Receiver, Sender};
use crossbeam::sync::WaitGroup;

use crate::errors::Error;

type Job = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

pub(crate) enum WorkItem<T> {
    Item(T),
    Stop,
}

/// A queued job together with its membership in the pending wait group.
struct Task {
    job: Job,
    done: WaitGroup,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<T> {
    // jobs run outside of any lock, a poisoned lock still holds consistent data
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// A fixed-size pool of worker threads executing fallible jobs.
///
/// Jobs are taken from a shared channel in submission order. Errors and panics of
/// jobs are collected and reported by `join`. Dropping the pool stops and joins all
/// workers after the queued jobs are done.
pub struct ThreadPool {
    sender: Sender<WorkItem<Task>>,
    workers: Vec<thread::JoinHandle<()>>,
    pending: Mutex<WaitGroup>,
    errors: Arc<Mutex<Vec<anyhow::Error>>>,
}

impl ThreadPool {
    pub fn new(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(Error::InvalidConfig {
                msg: "worker pool needs at least one thread".to_owned(),
            }
            .into());
        }

        let (sender, receiver) = unbounded();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let workers = (0..threads)
            .map(|i| {
                let receiver = receiver.clone();
                let errors = Arc::clone(&errors);
                thread::Builder::new()
                    .name(format!("vargraph-worker-{}", i))
                    .spawn(move || work(receiver, errors))
            })
            .collect::<std::io::Result<Vec<_>>>()?;
        debug!("started worker pool with {} thread(s)", threads);

        Ok(ThreadPool {
            sender,
            workers,
            pending: Mutex::new(WaitGroup::new()),
            errors,
        })
    }

    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// Queue a job for execution.
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let task = Task {
            job: Box::new(job),
            done: lock(&self.pending).clone(),
        };
        if self.sender.send(WorkItem::Item(task)).is_err() {
            return Err(Error::TaskFailed {
                msg: "worker pool is shut down".to_owned(),
            }
            .into());
        }
        Ok(())
    }

    /// Block until all submitted jobs are done. Returns the first error of any job
    /// since the last call, further errors are logged.
    pub fn join(&self) -> Result<()> {
        let pending = mem::replace(&mut *lock(&self.pending), WaitGroup::new());
        pending.wait();

        let mut errors: Vec<_> = lock(&self.errors).drain(..).collect();
        if errors.is_empty() {
            return Ok(());
        }
        for e in &errors[1..] {
            warn!("job failed: {:#}", e);
        }
        Err(errors.swap_remove(0))
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        for _ in &self.workers {
            // a closed channel means the workers are gone already
            let _ = self.sender.send(WorkItem::Stop);
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("worker thread panicked");
            }
        }
    }
}

fn work(receiver: Receiver<WorkItem<Task>>, errors: Arc<Mutex<Vec<anyhow::Error>>>) {
    for item in receiver {
        match item {
            WorkItem::Item(Task { job, done }) => {
                let ret = panic::catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|cause| {
                    Err(Error::TaskFailed {
                        msg: panic_message(&*cause),
                    }
                    .into())
                });
                if let Err(e) = ret {
                    lock(&errors).push(e);
                }
                drop(done);
            }
            WorkItem::Stop => break,
        }
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> String {
    if let Some(msg) = cause.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = cause.downcast_ref::<String>() {
        msg.clone()
    } else {
        "job panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_pool_runs_all_jobs() {
        let pool = ThreadPool::new(4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        }
        pool.join().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 100);

        // the pool stays usable after a join
        let counter2 = Arc::clone(&counter);
        pool.submit(move || {
            counter2.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        pool.join().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 101);
    }

    #[test]
    fn test_pool_reports_errors_and_panics() {
        let pool = ThreadPool::new(2).unwrap();
        pool.submit(|| Err(anyhow::anyhow!("broken job"))).unwrap();
        assert_eq!(pool.join().unwrap_err().to_string(), "broken job");

        pool.submit(|| panic!("exploding job")).unwrap();
        let err = pool.join().unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::TaskFailed {
                msg: "exploding job".to_owned()
            })
        );

        assert!(pool.join().is_ok());
    }

    #[test]
    fn test_join_waits_for_running_jobs() {
        let pool = ThreadPool::new(2).unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..4 {
            let done = Arc::clone(&done);
            pool.submit(move || {
                thread::sleep(std::time::Duration::from_millis(20));
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        }
        pool.join().unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_zero_threads() {
        assert!(ThreadPool::new(0).is_err());
    }
}
