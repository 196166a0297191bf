//! The byte channel to the server process.

use core::cell::RefCell;
use std::io;

use buggy::BugExt;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::{error::Error, message::Invocation, ser::serialize_message};

/// The default size of a single request.
///
/// Messages larger than this are chunked.
pub const TRANSPORT_BUFFER_REQUEST_SIZE: usize = 64 * 1024;

/// A synchronous request/response channel.
///
/// Framing is the transport's business. It receives exactly
/// one serialized envelope and returns exactly one.
pub trait Transport: Send {
    /// Returns the largest request the transport accepts.
    fn request_capacity(&self) -> usize {
        TRANSPORT_BUFFER_REQUEST_SIZE
    }

    /// Sends `request` and blocks until the response arrives.
    fn send_and_receive(&mut self, request: &[u8]) -> Result<Vec<u8>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn request_capacity(&self) -> usize {
        (**self).request_capacity()
    }

    fn send_and_receive(&mut self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        (**self).send_and_receive(request)
    }
}

/// An error from a [`Transport`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer went away.
    #[error("peer disconnected")]
    Disconnected,
    /// An IO error.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Any other error.
    #[error(transparent)]
    Other(Box<dyn core::error::Error + Send + Sync + 'static>),
}

impl TransportError {
    /// Wraps an arbitrary error.
    pub fn other<E>(err: E) -> Self
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(err))
    }
}

pub(crate) struct ChannelState {
    transport: Box<dyn Transport>,
    send_buffer: Vec<u8>,
}

/// A [`Transport`], its send buffer, and the lock that orders
/// every caller sharing them.
pub(crate) struct Channel {
    inner: ReentrantMutex<RefCell<ChannelState>>,
    capacity: usize,
}

/// Proof that the current thread holds the channel.
pub(crate) type ChannelGuard<'a> = ReentrantMutexGuard<'a, RefCell<ChannelState>>;

impl Channel {
    pub(crate) fn new(transport: Box<dyn Transport>) -> Self {
        let capacity = transport.request_capacity();
        Self {
            inner: ReentrantMutex::new(RefCell::new(ChannelState {
                transport,
                send_buffer: vec![0; capacity],
            })),
            capacity,
        }
    }

    /// Returns the largest request the transport accepts.
    pub(crate) const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Acquires the channel.
    ///
    /// The lock is re-entrant: the holder may perform further
    /// round trips while holding it.
    pub(crate) fn lock(&self) -> ChannelGuard<'_> {
        self.inner.lock()
    }

    /// Serializes `msg` into the send buffer and performs one
    /// round trip.
    pub(crate) fn round_trip(&self, msg: &Invocation<'_>) -> Result<Vec<u8>, Error> {
        let guard = self.lock();
        let mut state = guard
            .try_borrow_mut()
            .assume("channel is not borrowed across round trips")?;
        let ChannelState {
            transport,
            send_buffer,
        } = &mut *state;
        let request = serialize_message(msg, send_buffer)?;
        Ok(transport.send_and_receive(request)?)
    }
}
