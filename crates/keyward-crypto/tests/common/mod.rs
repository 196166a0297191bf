#![allow(
    dead_code,
    clippy::arithmetic_side_effects,
    clippy::panic,
    clippy::unwrap_used
)]

use std::sync::Arc;

use keyward_crypto::CryptoProviderProxy;
use keyward_ipc::{
    Config, Envelope, ErrorCode, FatalPolicy, ObjectId, SerializationTag, Session, Slot, TaskId,
    TRANSPORT_BUFFER_REQUEST_SIZE,
    testing::{Journal, Loopback, echo},
};

/// A fake crypto server and a client connected to it.
pub struct Server {
    pub session: Arc<Session>,
    pub provider: CryptoProviderProxy,
    pub journal: Journal,
}

impl Server {
    /// Returns every request sent for `task`.
    pub fn requests_for(&self, task: impl Into<TaskId>) -> Vec<Envelope> {
        let task = task.into();
        self.journal
            .requests()
            .into_iter()
            .filter(|r| r.task == task)
            .collect()
    }
}

/// Starts a server that answers every request with the slot
/// returned by `handler`, followed by the (possibly modified)
/// request slots.
pub fn serve<F>(handler: F) -> Server
where
    F: FnMut(TaskId, &mut Vec<Slot>) -> Slot + Send + 'static,
{
    serve_with(Config::default(), TRANSPORT_BUFFER_REQUEST_SIZE, handler)
}

pub fn serve_with<F>(config: Config, capacity: usize, mut handler: F) -> Server
where
    F: FnMut(TaskId, &mut Vec<Slot>) -> Slot + Send + 'static,
{
    let transport = Loopback::new(move |mut req: Envelope| {
        let ret = handler(req.task, &mut req.slots);
        echo(req, Some(ret))
    })
    .with_capacity(capacity);
    let journal = transport.journal();
    let session = Session::new(transport, config.with_fatal_policy(FatalPolicy::Report));
    let provider = CryptoProviderProxy::new(&session);
    Server {
        session,
        provider,
        journal,
    }
}

pub fn is(task: TaskId, want: impl Into<TaskId>) -> bool {
    task == want.into()
}

pub fn ok(slot: Slot) -> Slot {
    Slot::Fallible(Ok(Box::new(slot)))
}

pub fn fail(code: ErrorCode) -> Slot {
    Slot::Fallible(Err(code))
}

/// The answer to a fallible factory call that created the
/// object.
pub fn created() -> Slot {
    ok(Slot::Tag(SerializationTag::SkeletonCreated))
}

/// The answer to a fallible factory call that did not create
/// the object.
pub fn not_created() -> Slot {
    ok(Slot::Tag(SerializationTag::SkeletonNotCreated))
}

/// The answer to an infallible factory call.
pub fn tag(created: bool) -> Slot {
    Slot::Tag(if created {
        SerializationTag::SkeletonCreated
    } else {
        SerializationTag::SkeletonNotCreated
    })
}

/// Returns the id of the object a factory request asked the
/// server to create.
pub fn new_id(req: &Envelope) -> ObjectId {
    match req.slots.last() {
        Some(Slot::Proxy(id)) => *id,
        other => panic!("factory request without new id: {other:?}"),
    }
}
