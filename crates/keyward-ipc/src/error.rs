use buggy::Bug;
use serde::{Deserialize, Serialize};

use crate::{id::ObjectId, message::SlotKind, task::TaskId, transport::TransportError};

/// Shorthand for `Result`s that use [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// An error returned by a remote call.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The server reported an error.
    #[error("remote error: {0}")]
    Remote(#[from] ErrorCode),
    /// An argument was rejected before anything was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The server did not create the requested object.
    #[error("the server did not create the object")]
    NotCreated,
    /// The request could not be serialized.
    #[error("serialize error: {0}")]
    Serialize(#[from] SerializeError),
    /// The response could not be deserialized.
    #[error("deserialize error: {0}")]
    Deserialize(#[from] DeserializeError),
    /// The server returned more bytes than an out parameter can
    /// hold.
    #[error(
        "slot {index}: response region of {received} bytes overflows a {capacity} byte destination"
    )]
    OutParamOverflow {
        /// The argument index.
        index: usize,
        /// The size of the caller's region.
        capacity: usize,
        /// The size of the server's region.
        received: usize,
    },
    /// The transport failed.
    #[error("channel lost: {0}")]
    ChannelLost(#[from] TransportError),
    /// An internal bug was discovered.
    #[error(transparent)]
    Bug(#[from] Bug),
}

impl Error {
    /// Reports whether the error leaves the client and server
    /// in an unknown state.
    ///
    /// Fatal errors are handled according to the session's
    /// [`FatalPolicy`][crate::FatalPolicy].
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Serialize(_) | Self::ChannelLost(_) | Self::OutParamOverflow { .. }
        )
    }
}

/// The error domain shared with the server.
///
/// Codes are forwarded to the caller verbatim.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, thiserror::Error)]
#[non_exhaustive]
pub enum ErrorCode {
    /// An argument is invalid.
    #[error("invalid argument")]
    InvalidArgument,
    /// The input has an unsupported format.
    #[error("unsupported format")]
    UnsupportedFormat,
    /// Not enough resources to complete the operation.
    #[error("insufficient resource")]
    InsufficientResource,
    /// The resource was not reserved.
    #[error("unreserved resource")]
    UnreservedResource,
    /// The resource was modified concurrently.
    #[error("modified resource")]
    ModifiedResource,
    /// A logical fault occurred on the server.
    #[error("logic fault")]
    LogicFault,
    /// The input has an invalid size.
    #[error("invalid input size")]
    InvalidInputSize,
    /// Operations were invoked in the wrong order.
    #[error("invalid usage order")]
    InvalidUsageOrder,
    /// The context has not been initialized.
    #[error("context not initialized")]
    UninitializedContext,
    /// Processing has not been started.
    #[error("processing not started")]
    ProcessingNotStarted,
    /// Processing has not been finished.
    #[error("processing not finished")]
    ProcessingNotFinished,
    /// The output buffer is too small.
    #[error("buffer too small")]
    InsufficientCapacity,
    /// The supplied object is incompatible with the context.
    #[error("incompatible object")]
    IncompatibleObject,
    /// The supplied object has an unexpected type.
    #[error("bad object type")]
    BadObjectType,
    /// An argument refers to an object the server does not know.
    #[error("bad object reference")]
    BadObjectReference,
    /// The identifier is unknown.
    #[error("unknown identifier")]
    UnknownIdentifier,
    /// The caller is not allowed to perform the operation.
    #[error("access violation")]
    AccessViolation,
    /// The container holds no object.
    #[error("empty container")]
    EmptyContainer,
    /// The value violates the content restrictions.
    #[error("content restrictions violation")]
    ContentRestrictions,
    /// The server hit an unexpected runtime fault.
    #[error("runtime fault")]
    RuntimeFault,
}

/// An error from [`serialize_message`][crate::serialize_message].
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum SerializeError {
    /// The destination buffer is smaller than the message.
    #[error("buffer too small: need {required} bytes, have {available}")]
    BufferTooSmall {
        /// The serialized size of the message.
        required: usize,
        /// The size of the destination buffer.
        available: usize,
    },
    /// The transport cannot carry even an empty chunk.
    #[error("a {capacity} byte request cannot hold a {overhead} byte envelope")]
    NoRoomForChunk {
        /// The transport's request capacity.
        capacity: usize,
        /// The fixed size of the envelope.
        overhead: usize,
    },
    /// The encoder failed.
    #[error("unable to encode message: {0}")]
    Encode(#[from] postcard::Error),
}

/// An error from [`deserialize_message`][crate::deserialize_message]
/// or from reading a [`Response`][crate::Response].
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum DeserializeError {
    /// The buffer is truncated or carries an invalid tag.
    #[error("malformed message: {0}")]
    Malformed(postcard::Error),
    /// The buffer has bytes after the message.
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),
    /// The response answers a different task.
    #[error("response task {found} does not match request task {expected}")]
    TaskMismatch {
        /// The request's task.
        expected: TaskId,
        /// The response's task.
        found: TaskId,
    },
    /// The response answers a different object.
    #[error("response object {found} does not match request object {expected}")]
    ObjectMismatch {
        /// The request's object.
        expected: ObjectId,
        /// The response's object.
        found: ObjectId,
    },
    /// The response has the wrong number of slots.
    #[error("expected {expected} slots, found {found}")]
    SlotCount {
        /// The number of slots the request implies.
        expected: usize,
        /// The number of slots in the response.
        found: usize,
    },
    /// A slot could not be read.
    #[error("slot {index}: {source}")]
    Slot {
        /// The slot index.
        index: usize,
        /// Why the slot could not be read.
        #[source]
        source: SlotError,
    },
}

/// An error converting a single [`Slot`][crate::Slot].
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum SlotError {
    /// The slot has a different kind.
    #[error("expected {expected}, found {found}")]
    Mismatch {
        /// The statically expected kind.
        expected: SlotKind,
        /// The kind on the wire.
        found: SlotKind,
    },
    /// The slot was already taken.
    #[error("slot already consumed")]
    Consumed,
    /// The slot does not exist.
    #[error("no such slot")]
    Missing,
    /// The value does not fit the expected type.
    #[error("value out of range")]
    OutOfRange,
    /// The slot refers to an object the call never mentioned.
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),
    /// Ownership of the object was already transferred.
    #[error("object {0} claimed twice")]
    DuplicateObject(ObjectId),
    /// A response region does not fit the caller's region.
    #[error("{received} byte region overflows {capacity} byte destination")]
    Overflow {
        /// The size of the caller's region.
        capacity: usize,
        /// The size of the server's region.
        received: usize,
    },
}

impl SlotError {
    pub(crate) fn at(self, index: usize) -> DeserializeError {
        DeserializeError::Slot {
            index,
            source: self,
        }
    }
}
