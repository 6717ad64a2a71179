//! Write queue worker
//!
//! One thread, one crossbeam channel, one file handle.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};

use crate::error::{JournalError, Result};
use crate::wal::{LogWriter, Payload, Record};

use super::{Counters, QueueStats, Task};

/// Handle to the background writer
///
/// Dropping the handle closes the queue and waits for the worker to drain
/// everything already enqueued.
pub struct WriteQueue<V> {
    sender: Option<Sender<Task<V>>>,
    handle: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl<V: Payload> WriteQueue<V> {
    /// Start the worker; it takes exclusive ownership of `writer`
    ///
    /// The worker thread logs through `dispatch` for its whole lifetime.
    pub fn spawn(writer: LogWriter, dispatch: tracing::Dispatch) -> Result<Self> {
        let (sender, receiver) = channel::unbounded();
        let counters = Arc::new(Counters::default());

        let worker = Worker {
            writer,
            receiver,
            counters: Arc::clone(&counters),
        };

        let handle = thread::Builder::new()
            .name("journalkv-writer".to_string())
            .spawn(move || tracing::dispatcher::with_default(&dispatch, || worker.run()))?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            counters,
        })
    }

    /// Encode a record and queue it for appending. Never blocks on I/O.
    ///
    /// Encoding errors are returned here; nothing is queued for them.
    pub fn enqueue(&self, record: Record<V>) -> Result<()> {
        let payload = record.encode()?;
        self.send(Task::Append {
            kind: record.kind(),
            key: record.key().map(str::to_string),
            payload,
        })
    }

    /// Block until every record enqueued so far is written and synced
    pub fn flush(&self) -> Result<()> {
        let (reply, done) = channel::bounded(1);
        self.send(Task::Flush(reply))?;
        Completion(done).wait()
    }

    /// Replace the journal with a snapshot of `entries` and wait for it
    ///
    /// `entries` must reflect every record enqueued before this call.
    pub fn compact(&self, entries: BTreeMap<String, V>) -> Result<()> {
        self.begin_compaction(entries)?.wait()
    }

    /// Queue a compaction and return a handle to wait on
    pub fn begin_compaction(&self, entries: BTreeMap<String, V>) -> Result<Completion> {
        let (reply, done) = channel::bounded(1);
        self.send(Task::Compact {
            entries,
            reply: Some(reply),
        })?;
        Ok(Completion(done))
    }

    /// Queue a compaction without waiting for it
    pub fn compact_in_background(&self, entries: BTreeMap<String, V>) -> Result<()> {
        self.send(Task::Compact {
            entries,
            reply: None,
        })
    }

    fn send(&self, task: Task<V>) -> Result<()> {
        match &self.sender {
            Some(sender) => sender.send(task).map_err(|_| JournalError::QueueClosed),
            None => Err(JournalError::QueueClosed),
        }
    }
}

impl<V> WriteQueue<V> {
    /// Snapshot of the worker counters
    pub fn stats(&self) -> QueueStats {
        self.counters.load()
    }

    /// Tasks waiting for the worker
    pub fn pending(&self) -> usize {
        self.sender.as_ref().map_or(0, |sender| sender.len())
    }

    /// Whether `shutdown` has run
    pub fn is_closed(&self) -> bool {
        self.sender.is_none()
    }

    /// Close the queue, let the worker drain it, and join the thread
    pub fn shutdown(&mut self) -> Result<()> {
        drop(self.sender.take());
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| JournalError::WriterPanicked)?;
        }
        Ok(())
    }
}

impl<V> Drop for WriteQueue<V> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!(error = %e, "write queue did not shut down cleanly");
        }
    }
}

/// Outcome of a task the worker has not finished yet
#[must_use = "call wait() to learn whether the task succeeded"]
pub struct Completion(Receiver<Result<()>>);

impl Completion {
    /// Block until the worker reports back
    pub fn wait(self) -> Result<()> {
        self.0.recv().map_err(|_| JournalError::QueueClosed)?
    }
}

struct Worker<V> {
    writer: LogWriter,
    receiver: Receiver<Task<V>>,
    counters: Arc<Counters>,
}

impl<V: Payload> Worker<V> {
    fn run(mut self) {
        tracing::info!(path = %self.writer.path().display(), "write queue started");

        while let Ok(task) = self.receiver.recv() {
            match task {
                Task::Append { kind, key, payload } => self.append(kind, key.as_deref(), &payload),
                Task::Flush(reply) => {
                    let _ = reply.send(self.writer.sync());
                }
                Task::Compact { entries, reply } => {
                    let result = self.compact(&entries);
                    if let Some(reply) = reply {
                        let _ = reply.send(result);
                    }
                }
            }
        }

        if let Err(e) = self.writer.sync() {
            tracing::error!(error = %e, "final journal sync failed");
        }

        tracing::info!(
            path = %self.writer.path().display(),
            frames = self.writer.frames_written(),
            "write queue stopped"
        );
    }

    fn append(&mut self, kind: &'static str, key: Option<&str>, payload: &[u8]) {
        let key = key.unwrap_or_default();
        tracing::debug!(kind, key, bytes = payload.len(), "writing record");

        match self.writer.append_frame(payload) {
            Ok(()) => Counters::bump(&self.counters.frames_appended),
            Err(e) => {
                Counters::bump(&self.counters.write_failures);
                tracing::error!(kind, key, error = %e, "failed to write record, dropping it");
            }
        }
    }

    fn compact(&mut self, entries: &BTreeMap<String, V>) -> Result<()> {
        let path = self.writer.path().to_path_buf();
        let before = self.writer.len();

        match LogWriter::rewrite(&path, entries, self.writer.sync_strategy()) {
            Ok(writer) => {
                tracing::info!(
                    path = %path.display(),
                    entries = entries.len(),
                    bytes_before = before,
                    bytes_after = writer.len(),
                    "journal compacted"
                );
                self.writer = writer;
                Counters::bump(&self.counters.compactions);
                Ok(())
            }
            Err(e) => {
                Counters::bump(&self.counters.compaction_failures);
                tracing::error!(path = %path.display(), error = %e, "compaction failed, keeping current journal");
                Err(e)
            }
        }
    }
}
