//! An in-process server for testing proxies.
//!
//! [`Loopback`] is a [`Transport`] that decodes each request,
//! records it in a [`Journal`], and hands it to a [`Skeleton`]
//! for an answer. Destroy notifications are answered by the
//! loopback itself.

#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![cfg(any(test, feature = "testing"))]
#![cfg_attr(docsrs, doc(cfg(feature = "testing")))]

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread::{self, ThreadId},
};

use spin::Mutex;

use crate::{
    de::deserialize_message,
    id::ObjectId,
    message::{Envelope, Slot},
    task::TaskId,
    transport::{TRANSPORT_BUFFER_REQUEST_SIZE, Transport, TransportError},
};

/// The server side of a [`Loopback`].
pub trait Skeleton: Send {
    /// Answers `request`.
    fn dispatch(&mut self, request: Envelope) -> Envelope;
}

impl<F> Skeleton for F
where
    F: FnMut(Envelope) -> Envelope + Send,
{
    fn dispatch(&mut self, request: Envelope) -> Envelope {
        self(request)
    }
}

/// Answers `request` by echoing its slots after `ret`.
///
/// This is the shape of every well-formed response: the
/// optional return slot followed by one slot per request slot.
pub fn echo(request: Envelope, ret: Option<Slot>) -> Envelope {
    Envelope {
        task: request.task,
        object: request.object,
        slots: ret.into_iter().chain(request.slots).collect(),
    }
}

/// A single request seen by a [`Loopback`].
#[derive(Clone, Debug)]
pub struct Record {
    /// The thread that sent the request.
    pub thread: ThreadId,
    /// The request.
    pub request: Envelope,
}

#[derive(Debug, Default)]
struct JournalInner {
    records: Mutex<Vec<Record>>,
    in_flight: AtomicBool,
    overlaps: AtomicUsize,
}

/// The requests a [`Loopback`] has served, in order.
#[derive(Clone, Debug, Default)]
pub struct Journal(Arc<JournalInner>);

impl Journal {
    /// Returns every record.
    pub fn records(&self) -> Vec<Record> {
        self.0.records.lock().clone()
    }

    /// Returns every request other than destroy notifications.
    pub fn requests(&self) -> Vec<Envelope> {
        self.0
            .records
            .lock()
            .iter()
            .filter(|r| r.request.task != TaskId::DESTROY)
            .map(|r| r.request.clone())
            .collect()
    }

    /// Returns the task of every request other than destroy
    /// notifications.
    pub fn tasks(&self) -> Vec<TaskId> {
        self.requests().into_iter().map(|r| r.task).collect()
    }

    /// Returns the ids named by destroy notifications.
    pub fn destroyed(&self) -> Vec<ObjectId> {
        self.0
            .records
            .lock()
            .iter()
            .filter(|r| r.request.task == TaskId::DESTROY)
            .map(|r| r.request.object)
            .collect()
    }

    /// Returns the number of requests that arrived while
    /// another request was still being served.
    pub fn overlaps(&self) -> usize {
        self.0.overlaps.load(Ordering::SeqCst)
    }

    /// Forgets every record.
    pub fn clear(&self) {
        self.0.records.lock().clear();
    }

    fn enter(&self, request: Envelope) {
        if self.0.in_flight.swap(true, Ordering::SeqCst) {
            self.0.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.0.records.lock().push(Record {
            thread: thread::current().id(),
            request,
        });
    }

    fn leave(&self) {
        self.0.in_flight.store(false, Ordering::SeqCst);
    }
}

/// A [`Transport`] served by an in-process [`Skeleton`].
#[derive(Debug)]
pub struct Loopback<S> {
    skeleton: S,
    capacity: usize,
    journal: Journal,
}

impl<S: Skeleton> Loopback<S> {
    /// Creates a loopback served by `skeleton`.
    pub fn new(skeleton: S) -> Self {
        Self {
            skeleton,
            capacity: TRANSPORT_BUFFER_REQUEST_SIZE,
            journal: Journal::default(),
        }
    }

    /// Limits requests to `capacity` bytes.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Returns the journal.
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

impl<S: Skeleton> Transport for Loopback<S> {
    fn request_capacity(&self) -> usize {
        self.capacity
    }

    fn send_and_receive(&mut self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        assert!(
            request.len() <= self.capacity,
            "{} byte request exceeds {} byte capacity",
            request.len(),
            self.capacity
        );
        let request = deserialize_message(request).map_err(TransportError::other)?;
        self.journal.enter(request.clone());
        let response = if request.task == TaskId::DESTROY {
            echo(request, None)
        } else {
            self.skeleton.dispatch(request)
        };
        // Give other threads a chance to collide.
        thread::yield_now();
        self.journal.leave();
        postcard::to_allocvec(&response).map_err(TransportError::other)
    }
}

/// A [`Transport`] whose peer is gone.
#[derive(Copy, Clone, Debug, Default)]
pub struct Broken;

impl Transport for Broken {
    fn send_and_receive(&mut self, _request: &[u8]) -> Result<Vec<u8>, TransportError> {
        Err(TransportError::Disconnected)
    }
}
