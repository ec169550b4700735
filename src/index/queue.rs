//! Bounded pool of analysis workers.
//!
//! Work items are pushed onto a bounded channel shared by a fixed number of
//! worker threads. Each item carries its own result sender, so a batch
//! collects exactly the results of the documents it submitted, in whatever
//! order the workers finish them.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::Mutex;

use crate::analysis::analyzer::per_field::PerFieldAnalyzer;
use crate::data::Document;
use crate::error::{EmberError, Result};
use crate::index::analyzed::{AnalysisResult, analyze_document};

/// Outcome of analyzing one document: its ID and the analysis result.
pub type AnalysisOutcome = (String, Result<AnalysisResult>);

/// One document waiting for analysis.
pub struct AnalysisWork {
    pub(crate) document: Document,
    pub(crate) analyzer: Arc<PerFieldAnalyzer>,
    pub(crate) store_locations: bool,
    pub(crate) results: Sender<AnalysisOutcome>,
}

impl AnalysisWork {
    pub fn new(
        document: Document,
        analyzer: Arc<PerFieldAnalyzer>,
        store_locations: bool,
        results: Sender<AnalysisOutcome>,
    ) -> Self {
        AnalysisWork {
            document,
            analyzer,
            store_locations,
            results,
        }
    }

    fn run(self) {
        let doc_id = self.document.id.clone().unwrap_or_default();
        let AnalysisWork {
            document,
            analyzer,
            store_locations,
            results,
        } = self;
        // A panicking analyzer fails this document only; the worker lives on.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            analyze_document(document, &analyzer, store_locations)
        }))
        .unwrap_or_else(|payload| {
            let message = panic_message(&*payload);
            log::error!("analyzer panicked on document '{doc_id}': {message}");
            Err(EmberError::analysis(format!("analyzer panicked: {message}")))
        });
        // The submitter may have given up on the batch; nothing to do then.
        let _ = results.send((doc_id, outcome));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

impl fmt::Debug for AnalysisWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisWork")
            .field("doc_id", &self.document.id)
            .finish()
    }
}

/// A fixed-size pool of analysis worker threads fed by a bounded queue.
///
/// The queue can be shared by several engines through an `Arc`.
pub struct AnalysisQueue {
    sender: Mutex<Option<Sender<AnalysisWork>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    num_workers: usize,
    capacity: usize,
}

impl fmt::Debug for AnalysisQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisQueue")
            .field("num_workers", &self.num_workers)
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl AnalysisQueue {
    /// Start `num_workers` threads consuming a queue of `capacity` items.
    pub fn new(num_workers: usize, capacity: usize) -> Result<Self> {
        if num_workers == 0 {
            return Err(EmberError::invalid_config(
                "analysis queue needs at least one worker",
            ));
        }
        if capacity == 0 {
            return Err(EmberError::invalid_config(
                "analysis queue capacity must be positive",
            ));
        }

        let (sender, receiver) = bounded::<AnalysisWork>(capacity);
        let mut workers = Vec::with_capacity(num_workers);
        for i in 0..num_workers {
            let receiver = receiver.clone();
            let handle = std::thread::Builder::new()
                .name(format!("ember-analysis-{i}"))
                .spawn(move || worker_loop(receiver))?;
            workers.push(handle);
        }
        log::debug!("started analysis queue with {num_workers} workers, capacity {capacity}");

        Ok(AnalysisQueue {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            num_workers,
            capacity,
        })
    }

    /// Enqueue work. Blocks while the queue is full.
    pub fn queue(&self, work: AnalysisWork) -> Result<()> {
        let sender = self.sender.lock().clone().ok_or(EmberError::Closed)?;
        sender.send(work).map_err(|_| EmberError::Closed)
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Stop accepting work, let workers drain what is already queued, and
    /// join them.
    pub fn close(&self) {
        let sender = self.sender.lock().take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if handle.join().is_err() {
                log::error!("analysis worker panicked");
            }
        }
        log::debug!("analysis queue closed");
    }
}

impl Drop for AnalysisQueue {
    fn drop(&mut self) {
        self.close();
    }
}

fn worker_loop(receiver: Receiver<AnalysisWork>) {
    for work in receiver.iter() {
        work.run();
    }
}
