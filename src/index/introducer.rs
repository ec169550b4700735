//! Single-writer introduction loop.
//!
//! Exactly one thread owns mutation of the root snapshot pointer. Batches
//! hand it [`Introduction`]s through a FIFO channel; the loop derives the
//! next snapshot from the current one, swaps the root under a write lock
//! held only for the swap, and completes the submitter's one-shot channel
//! with the published version.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use parking_lot::{Mutex, RwLock};
use roaring::RoaringBitmap;

use crate::engine::stats::Stats;
use crate::error::{EmberError, Result};
use crate::index::segment::{Segment, SegmentId};
use crate::index::snapshot::IndexSnapshot;

/// The root pointer shared by the engine, its readers and the loop.
pub type Root = Arc<RwLock<Arc<IndexSnapshot>>>;

/// One batch's effect on the index.
#[derive(Debug)]
pub struct Introduction {
    pub(crate) id: SegmentId,
    pub(crate) segment: Arc<dyn Segment>,
    /// Every external ID the batch touches, upserted or deleted.
    pub(crate) ids: Vec<String>,
    /// Newly obsoleted document numbers per existing segment, computed
    /// optimistically by the submitter.
    pub(crate) obsoletes: AHashMap<SegmentId, RoaringBitmap>,
    /// Internal key/value upserts (`Some`) and deletes (`None`).
    pub(crate) internal: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

const PENDING: u8 = 0;
const CLAIMED: u8 = 1;
const ABANDONED: u8 = 2;

struct PendingIntroduction {
    introduction: Introduction,
    claim: Arc<AtomicU8>,
    applied: Sender<Result<u64>>,
}

enum IntroducerMessage {
    Introduce(PendingIntroduction),
    Close,
}

/// Handle a submitter waits on until its introduction is published.
#[derive(Debug)]
pub struct Ticket {
    segment_id: SegmentId,
    claim: Arc<AtomicU8>,
    applied: Receiver<Result<u64>>,
}

impl Ticket {
    pub fn segment_id(&self) -> SegmentId {
        self.segment_id
    }

    /// Block until the introduction is published and return the new
    /// snapshot version.
    ///
    /// With a deadline, an introduction the loop has not started yet is
    /// abandoned and will never be applied. One the loop already claimed is
    /// waited for, since applying it is a short in-memory splice.
    pub fn wait(self, timeout: Option<Duration>) -> Result<u64> {
        let Some(timeout) = timeout else {
            return self.applied.recv().unwrap_or(Err(EmberError::Closed));
        };

        match self.applied.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Disconnected) => Err(EmberError::Closed),
            Err(RecvTimeoutError::Timeout) => {
                if self
                    .claim
                    .compare_exchange(PENDING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    log::warn!(
                        "introduction of segment {} abandoned after {timeout:?}",
                        self.segment_id
                    );
                    Err(EmberError::timeout(format!(
                        "segment {} was not introduced within {timeout:?}",
                        self.segment_id
                    )))
                } else {
                    self.applied.recv().unwrap_or(Err(EmberError::Closed))
                }
            }
        }
    }
}

/// Owner of the introduction thread.
pub struct Introducer {
    sender: Sender<IntroducerMessage>,
    /// Pairs segment ID allocation with enqueueing so that queue order and
    /// ID order agree.
    submit_lock: Mutex<()>,
    next_segment_id: AtomicU64,
    thread: Mutex<Option<JoinHandle<()>>>,
    failure: Arc<OnceLock<String>>,
}

impl fmt::Debug for Introducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Introducer")
            .field("next_segment_id", &self.next_segment_id)
            .field("running", &self.thread.lock().is_some())
            .field("failure", &self.failure.get())
            .finish()
    }
}

impl Introducer {
    /// Spawn the loop over `root`.
    pub fn start(root: Root, stats: Arc<Stats>) -> Result<Self> {
        let (sender, receiver) = unbounded();
        let failure = Arc::new(OnceLock::new());
        let loop_failure = Arc::clone(&failure);
        let thread = std::thread::Builder::new()
            .name("ember-introducer".to_string())
            .spawn(move || run(receiver, root, stats, loop_failure))?;

        Ok(Introducer {
            sender,
            submit_lock: Mutex::new(()),
            next_segment_id: AtomicU64::new(0),
            thread: Mutex::new(Some(thread)),
            failure,
        })
    }

    /// Why the index became unusable, if it did.
    pub fn failure(&self) -> Option<&str> {
        self.failure.get().map(|s| s.as_str())
    }

    /// Assign the next segment ID and enqueue the introduction.
    pub fn submit(
        &self,
        segment: Arc<dyn Segment>,
        ids: Vec<String>,
        obsoletes: AHashMap<SegmentId, RoaringBitmap>,
        internal: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    ) -> Result<Ticket> {
        if let Some(reason) = self.failure() {
            return Err(EmberError::index(format!("index is unusable: {reason}")));
        }

        let _guard = self.submit_lock.lock();
        let current = self.next_segment_id.load(Ordering::Acquire);
        let id = current
            .checked_add(1)
            .ok_or_else(|| EmberError::index("segment id counter overflow"))?;
        self.next_segment_id.store(id, Ordering::Release);

        let claim = Arc::new(AtomicU8::new(PENDING));
        let (applied_tx, applied_rx) = bounded(1);
        let pending = PendingIntroduction {
            introduction: Introduction {
                id,
                segment,
                ids,
                obsoletes,
                internal,
            },
            claim: Arc::clone(&claim),
            applied: applied_tx,
        };
        self.sender
            .send(IntroducerMessage::Introduce(pending))
            .map_err(|_| EmberError::Closed)?;

        Ok(Ticket {
            segment_id: id,
            claim,
            applied: applied_rx,
        })
    }

    /// Stop the loop. Introductions queued before this call are applied;
    /// later ones fail with [`EmberError::Closed`].
    pub fn close(&self) -> Result<()> {
        let Some(thread) = self.thread.lock().take() else {
            return Ok(());
        };
        // The loop may already be gone after a fatal error.
        let _ = self.sender.send(IntroducerMessage::Close);
        thread
            .join()
            .map_err(|_| EmberError::internal("introducer thread panicked"))
    }
}

impl Drop for Introducer {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::error!("failed to stop introducer: {e}");
        }
    }
}

fn reject(pending: PendingIntroduction, err: EmberError) {
    let _ = pending.applied.send(Err(err));
}

fn run(
    receiver: Receiver<IntroducerMessage>,
    root: Root,
    stats: Arc<Stats>,
    failure: Arc<OnceLock<String>>,
) {
    log::debug!("introducer started");

    while let Ok(message) = receiver.recv() {
        let pending = match message {
            IntroducerMessage::Introduce(pending) => pending,
            IntroducerMessage::Close => break,
        };

        if let Some(reason) = failure.get() {
            stats.incr_introductions_rejected();
            reject(
                pending,
                EmberError::index(format!("index is unusable: {reason}")),
            );
            continue;
        }

        if pending
            .claim
            .compare_exchange(PENDING, CLAIMED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            stats.incr_introductions_abandoned();
            continue;
        }

        let start = Instant::now();
        // Only this thread replaces the root, so this is also the latest one.
        let current = root.read().clone();
        match current.introduce(&pending.introduction) {
            Ok((next, report)) => {
                let version = next.version();
                *root.write() = Arc::new(next);

                stats.record_introduction(start.elapsed(), &report, version);
                log::debug!(
                    "introduced segment {} as version {version}",
                    pending.introduction.id
                );
                let _ = pending.applied.send(Ok(version));
            }
            Err(e) => {
                log::error!(
                    "failed to introduce segment {}: {e}; index is now unusable",
                    pending.introduction.id
                );
                let _ = failure.set(e.to_string());
                stats.incr_introductions_rejected();
                reject(pending, e);
            }
        }
    }

    for message in receiver.try_iter() {
        if let IntroducerMessage::Introduce(pending) = message {
            stats.incr_introductions_rejected();
            reject(pending, EmberError::Closed);
        }
    }
    log::debug!("introducer stopped");
}
