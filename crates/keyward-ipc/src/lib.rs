//! The Keyward remote invocation core.
//!
//! # Overview
//!
//! Every cryptographic primitive used by a Keyward client lives
//! in a separate server process. The client only holds
//! *proxies*: stand-ins whose methods marshal each call across
//! an inter-process channel and reconstruct the typed result.
//! This crate is the machinery those proxies share.
//!
//! A remote call goes through the following steps:
//!
//! 1. The caller's arguments are described by an ordered list
//!    of [`Arg`]s which alias the caller's variables.
//! 2. [`build_invocation`] wraps them into an [`Invocation`]
//!    addressed to a [`TaskId`] and an [`ObjectId`].
//! 3. The invocation is serialized into the channel's send
//!    buffer ([`serialize_message`]), split into several round
//!    trips if a single byte region is too large for the
//!    transport ([`ChunkPlan`]).
//! 4. The [`Transport`] performs a synchronous round trip while
//!    the channel's re-entrant lock is held.
//! 5. The response is parsed ([`deserialize_message`]) and
//!    checked against the shape of the request; proxy references
//!    are resolved through a per-call [`LifetimeManager`].
//! 6. Server errors are returned as [`Error::Remote`].
//! 7. Out parameters are copied back into the caller's variables
//!    ([`assign_all_out_parameters`]).
//! 8. The primary result is extracted, which for factory calls
//!    means inspecting the [`SerializationTag`] to learn whether
//!    the server actually created the object.
//!
//! [`ProxyBase`] drives the whole sequence and also owns the
//! destroy-notification protocol: a proxy whose server
//! counterpart was created tells the server when it is dropped.
//!
//! # Failures
//!
//! Server-reported errors and local validation errors are
//! ordinary [`Error`]s. A broken channel, an unserializable
//! request, or an out parameter that cannot hold the server's
//! answer leave the client and server out of sync; what happens
//! then is chosen by [`FatalPolicy`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod chunk;
mod de;
mod deletion;
mod error;
mod id;
mod message;
mod outparam;
mod proxy;
mod ser;
mod session;
mod task;
pub mod testing;
mod transport;

pub use buggy;

pub use crate::{
    builder::build_invocation,
    chunk::ChunkPlan,
    de::{FromSlot, LifetimeManager, ObjectRef, Response, deserialize_message},
    deletion::DeletionHandler,
    error::*,
    id::{ObjectId, ObjectTable},
    message::{Envelope, Invocation, SerializationTag, Slot, SlotKind, SlotRef, ToSlot},
    outparam::{Arg, OutParam, Region, assign_all_out_parameters},
    proxy::{Proxy, ProxyBase},
    ser::{BufferLength, serialize_message, serialized_length},
    session::{Config, DEFAULT_MAX_PROXY_BATCH, FatalPolicy, Session},
    task::TaskId,
    transport::{TRANSPORT_BUFFER_REQUEST_SIZE, Transport, TransportError},
};
