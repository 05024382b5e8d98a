//! In-memory fakes of the collaborator clients, shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWriteExt, DuplexStream, ReadBuf};
use tokio::time::Instant;

use crate::clients::{ChannelProvisioner, LogSource, LogStream, Publisher};
use crate::error::{ChannelOp, Error};
use crate::model::{Instance, InstanceIdentity, Phase};

pub(crate) fn instance(name: &str, app: &str, phase: Phase) -> Instance {
    Instance::new(InstanceIdentity::new("ns", name), phase).with_label("app", app)
}

/// Read half that counts how often it was closed (dropped).
struct Tracked {
    inner: DuplexStream,
    closed: Arc<AtomicUsize>,
}

impl AsyncRead for Tracked {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Log source backed by in-memory pipes; tests write into the other end.
#[derive(Default)]
pub(crate) struct MockSource {
    opens: AtomicUsize,
    fail_next: AtomicUsize,
    closed: Arc<AtomicUsize>,
    writers: Mutex<HashMap<InstanceIdentity, DuplexStream>>,
}

impl MockSource {
    pub(crate) fn fail_next_opens(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub(crate) fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Writes `bytes` into the log of `id`. Panics if no stream is open.
    pub(crate) async fn write(&self, id: &InstanceIdentity, bytes: &[u8]) {
        let mut w = self.writers.lock().unwrap().remove(id).expect("stream not open");
        w.write_all(bytes).await.unwrap();
        self.writers.lock().unwrap().insert(id.clone(), w);
    }

    /// Ends the log of `id` (reader sees end of stream).
    pub(crate) fn end(&self, id: &InstanceIdentity) {
        self.writers.lock().unwrap().remove(id);
    }
}

#[async_trait]
impl LogSource for MockSource {
    async fn open(&self, id: &InstanceIdentity) -> Result<LogStream, Error> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let pending = self.fail_next.load(Ordering::SeqCst);
        if pending > 0 {
            self.fail_next.store(pending - 1, Ordering::SeqCst);
            return Err(Error::StreamOpen {
                instance: id.clone(),
                reason: "container is waiting to start".into(),
            });
        }
        let (writer, reader) = tokio::io::duplex(4096);
        self.writers.lock().unwrap().insert(id.clone(), writer);
        Ok(Box::pin(Tracked {
            inner: reader,
            closed: Arc::clone(&self.closed),
        }))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Published {
    pub channel: String,
    pub key: String,
    pub payload: Vec<u8>,
    pub at: Instant,
}

/// Publisher that records every record it is given.
#[derive(Default)]
pub(crate) struct RecordingPublisher {
    records: Mutex<Vec<Published>>,
    failing: AtomicBool,
    flushed: AtomicUsize,
}

impl RecordingPublisher {
    pub(crate) fn records(&self) -> Vec<Published> {
        self.records.lock().unwrap().clone()
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn flushes(&self) -> usize {
        self.flushed.load(Ordering::SeqCst)
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&self, channel: &str, key: &str, payload: &[u8]) -> Result<(), Error> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Publish {
                channel: channel.into(),
                reason: "queue full".into(),
            });
        }
        self.records.lock().unwrap().push(Published {
            channel: channel.into(),
            key: key.into(),
            payload: payload.to_vec(),
            at: Instant::now(),
        });
        Ok(())
    }

    fn flush(&self, _timeout: std::time::Duration) {
        self.flushed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Provisioner keeping topics in a set; mirrors the admin API's conflict codes.
#[derive(Default)]
pub(crate) struct MemoryProvisioner {
    topics: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(ChannelOp, String)>>,
}

impl MemoryProvisioner {
    pub(crate) fn calls(&self) -> Vec<(ChannelOp, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelProvisioner for MemoryProvisioner {
    async fn create(&self, name: &str) -> Result<(), Error> {
        self.calls.lock().unwrap().push((ChannelOp::Create, name.into()));
        if self.topics.lock().unwrap().insert(name.into()) {
            Ok(())
        } else {
            Err(Error::ChannelConflict {
                op: ChannelOp::Create,
                name: name.into(),
                code: 40002,
            })
        }
    }

    async fn delete(&self, name: &str) -> Result<(), Error> {
        self.calls.lock().unwrap().push((ChannelOp::Delete, name.into()));
        if self.topics.lock().unwrap().remove(name) {
            Ok(())
        } else {
            Err(Error::ChannelConflict {
                op: ChannelOp::Delete,
                name: name.into(),
                code: 40403,
            })
        }
    }
}
