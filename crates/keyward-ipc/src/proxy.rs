//! Proxies and the generic call engine.

use std::sync::Arc;

use buggy::BugExt;
use tracing::{debug, error, trace};

use crate::{
    builder::build_invocation,
    chunk::ChunkPlan,
    de::{FromSlot, LifetimeManager, Response, deserialize_message},
    deletion::DeletionHandler,
    error::{Error, Result, SlotError},
    id::ObjectId,
    message::{Invocation, SerializationTag, Slot, SlotRef},
    outparam::{Arg, assign_all_out_parameters},
    ser::serialized_length,
    session::Session,
    task::TaskId,
};

/// A client-side stand-in for a server object.
pub trait Proxy: Sized {
    /// Wraps a base whose server counterpart exists.
    fn from_base(base: ProxyBase) -> Self;

    /// Returns the proxy's base.
    fn base(&self) -> &ProxyBase;

    /// Unwraps the proxy's base.
    fn into_base(self) -> ProxyBase;

    /// Returns the id of the server counterpart.
    fn object_id(&self) -> ObjectId {
        self.base().id()
    }
}

/// Declares a proxy type that wraps a [`ProxyBase`].
///
/// # Example
///
/// ```
/// keyward_ipc::proxy! {
///     /// A counter living in the server.
///     pub struct CounterProxy;
/// }
/// ```
#[macro_export]
macro_rules! proxy {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug)]
        $vis struct $name($crate::ProxyBase);

        impl $crate::Proxy for $name {
            #[inline]
            fn from_base(base: $crate::ProxyBase) -> Self {
                Self(base)
            }

            #[inline]
            fn base(&self) -> &$crate::ProxyBase {
                &self.0
            }

            #[inline]
            fn into_base(self) -> $crate::ProxyBase {
                self.0
            }
        }
    };
}

/// The part every proxy shares.
///
/// A base starts out unregistered: its id is reserved but the
/// server knows nothing about it. It becomes registered when a
/// factory call reports that the server created the counterpart.
/// Dropping a registered base tells the server to destroy the
/// counterpart; dropping an unregistered one does not.
pub struct ProxyBase {
    session: Arc<Session>,
    id: ObjectId,
    deletion: DeletionHandler,
}

impl ProxyBase {
    /// Returns the base for provider-level calls.
    ///
    /// It targets [`ObjectId::PROVIDER`] and never sends a
    /// destroy notification.
    pub(crate) fn provider(session: &Arc<Session>) -> Self {
        Self {
            session: Arc::clone(session),
            id: ObjectId::PROVIDER,
            deletion: DeletionHandler::new(),
        }
    }

    /// Reserves a new id for a proxy the server does not know
    /// about yet.
    pub fn unregistered(session: &Arc<Session>) -> Result<Self> {
        let id = session.allocate()?;
        Ok(Self {
            session: Arc::clone(session),
            id,
            deletion: DeletionHandler::new(),
        })
    }

    /// Returns the id of the server counterpart.
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    /// Returns the session.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Reports whether dropping the base notifies the server.
    pub fn is_registered(&self) -> bool {
        self.deletion.is_armed()
    }

    /// Gives up responsibility for destroying the server
    /// counterpart and returns its id.
    ///
    /// Used when another server object takes ownership of the
    /// counterpart.
    pub fn transfer_ownership(self) -> ObjectId {
        self.deletion.set_armed(false);
        self.id
    }

    /// Runs `f` while holding the channel.
    ///
    /// Calls made by `f` on the same session are not
    /// interleaved with calls from other threads.
    pub fn with_channel<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let _guard = self.session.lock();
        f(self)
    }

    fn register(self) -> Self {
        self.deletion.set_armed(true);
        self
    }

    /// Performs one round trip and checks the response against
    /// `msg`.
    fn invoke(
        &self,
        msg: &Invocation<'_>,
        start: usize,
        objects: LifetimeManager,
    ) -> Result<Response> {
        let _guard = self.session.lock();
        debug!(task = %msg.task(), object = %msg.object(), "remote call");
        let bytes = self.session.round_trip(msg)?;
        let env = deserialize_message(&bytes)?;
        Ok(Response::new(env, msg, start, objects)?)
    }

    fn assign(
        &self,
        task: TaskId,
        start: usize,
        resp: &mut Response,
        args: &mut [Arg<'_>],
    ) -> Result<()> {
        assign_all_out_parameters(start, resp, args).map_err(|err| self.session.escalate(task, err))
    }

    /// Calls an operation that returns nothing.
    pub fn call(&self, task: impl Into<TaskId>, args: &mut [Arg<'_>]) -> Result<()> {
        let task = task.into();
        let mut resp = self.invoke(&build_invocation(task, self.id, args), 0, LifetimeManager::new())?;
        self.assign(task, 0, &mut resp, args)
    }

    /// Calls an operation that returns a plain value.
    pub fn call_returning<R: FromSlot>(
        &self,
        task: impl Into<TaskId>,
        args: &mut [Arg<'_>],
    ) -> Result<R> {
        let task = task.into();
        let mut resp = self.invoke(&build_invocation(task, self.id, args), 1, LifetimeManager::new())?;
        self.assign(task, 1, &mut resp, args)?;
        Ok(resp.take_as(0)?)
    }

    /// Calls an operation that may fail on the server.
    ///
    /// On failure the server's error code is returned and the
    /// caller's out parameters are left untouched.
    pub fn call_fallible<R: FromSlot>(
        &self,
        task: impl Into<TaskId>,
        args: &mut [Arg<'_>],
    ) -> Result<R> {
        let task = task.into();
        let mut resp = self.invoke(&build_invocation(task, self.id, args), 1, LifetimeManager::new())?;
        let ret = resp.raise()?;
        self.assign(task, 1, &mut resp, args)?;
        Ok(R::from_slot(ret, resp.objects_mut()).map_err(|err| err.at(0))?)
    }

    /// Calls a factory operation that returns a new proxy.
    ///
    /// Returns `None` if the server did not create the object.
    pub fn create<P: Proxy>(
        &self,
        task: impl Into<TaskId>,
        args: &mut [Arg<'_>],
    ) -> Result<Option<P>> {
        let task = task.into();
        let (mut resp, new) = self.invoke_factory(task, args)?;
        self.assign(task, 1, &mut resp, args)?;
        let tag = resp.take(0)?;
        self.adopt(task, tag, new, args.len(), &mut resp)
    }

    /// Calls a fallible factory operation that returns a new
    /// proxy.
    ///
    /// Fails with [`Error::NotCreated`] if the server did not
    /// create the object.
    pub fn create_fallible<P: Proxy>(
        &self,
        task: impl Into<TaskId>,
        args: &mut [Arg<'_>],
    ) -> Result<P> {
        let task = task.into();
        let (mut resp, new) = self.invoke_factory(task, args)?;
        let tag = resp.raise()?;
        self.assign(task, 1, &mut resp, args)?;
        self.adopt(task, tag, new, args.len(), &mut resp)?
            .ok_or(Error::NotCreated)
    }

    /// Mints the proxy a factory call may create and sends its
    /// id along with `args`.
    fn invoke_factory(&self, task: TaskId, args: &[Arg<'_>]) -> Result<(Response, ObjectId)> {
        let new = Self::unregistered(&self.session)?;
        let id = new.id();
        let mut objects = LifetimeManager::new();
        objects.expect(new);

        let mut msg = build_invocation(task, self.id, args);
        msg.add_new_proxy_id(id);
        let resp = self.invoke(&msg, 1, objects)?;
        Ok((resp, id))
    }

    /// Turns a factory call's tag into the new proxy.
    ///
    /// An unregistered proxy is dropped with the response and
    /// never notifies the server.
    fn adopt<P: Proxy>(
        &self,
        task: TaskId,
        tag: Slot,
        id: ObjectId,
        nargs: usize,
        resp: &mut Response,
    ) -> Result<Option<P>> {
        match tag {
            Slot::Tag(SerializationTag::SkeletonCreated) => {
                // The new id follows the return slot and the
                // caller's arguments.
                let index = nargs.saturating_add(1);
                let base = resp.claim(id).map_err(|err| err.at(index))?;
                Ok(Some(P::from_base(base.register())))
            }
            Slot::Tag(SerializationTag::SkeletonNotCreated) => {
                debug!(%task, %id, "server did not create object");
                Ok(None)
            }
            slot => {
                error!(%task, %id, found = %slot.kind(), "invalid serialization tag");
                Ok(None)
            }
        }
    }

    /// Calls a factory operation that returns several proxies.
    ///
    /// Up to [`Config::max_proxy_batch`][crate::Config::max_proxy_batch]
    /// ids are reserved and sent to the server, which returns
    /// how many of them it used. Those proxies are appended to
    /// `out` in order and their number is returned.
    pub fn create_many<P: Proxy>(
        &self,
        task: impl Into<TaskId>,
        args: &mut [Arg<'_>],
        out: &mut Vec<P>,
    ) -> Result<usize> {
        let task = task.into();
        let batch = self.session.config().max_proxy_batch();
        let mut objects = LifetimeManager::new();
        let mut ids = Vec::with_capacity(batch);
        for _ in 0..batch {
            let new = Self::unregistered(&self.session)?;
            ids.push(new.id());
            objects.expect(new);
        }

        let mut resp = {
            let mut msg = build_invocation(task, self.id, args);
            msg.add_new_proxy_ids(&ids);
            self.invoke(&msg, 1, objects)?
        };
        let count = resp.raise()?;
        self.assign(task, 1, &mut resp, args)?;
        let n = usize::from_slot(count, resp.objects_mut()).map_err(|err| err.at(0))?;

        let index = args.len().saturating_add(1);
        let created = ids
            .get(..n)
            .ok_or(SlotError::OutOfRange.at(0))?;
        out.reserve(n);
        for id in created {
            let base = resp.claim(*id).map_err(|err| err.at(index))?;
            out.push(P::from_base(base.register()));
        }
        debug!(%task, created = n, reserved = batch, "server created objects");
        Ok(n)
    }

    /// Calls a fallible operation whose first argument is a
    /// memory region of any size.
    ///
    /// If the request does not fit the transport, `data` is
    /// split into consecutive chunks and the operation is called
    /// once per chunk, in order, with the same `rest` arguments.
    /// The channel is held until the last chunk is answered,
    /// whose result is returned.
    pub fn call_chunked<R: FromSlot>(
        &self,
        task: impl Into<TaskId>,
        data: &[u8],
        rest: &mut [Arg<'_>],
    ) -> Result<R> {
        let task = task.into();
        let plan = serialized_length(&chunk_invocation(task, self.id, data, rest))
            .and_then(|len| {
                ChunkPlan::new(data.len(), len.minimum, self.session.request_capacity())
            })
            .map_err(|err| self.session.escalate(task, err.into()))?;

        let _guard = self.session.lock();
        let count = plan.count();
        let mut last = None;
        for (i, chunk) in plan.split(data).enumerate() {
            if plan.is_chunked() {
                trace!(%task, chunk = i, count, len = chunk.len(), "sending chunk");
            }
            let mut resp =
                self.invoke(&chunk_invocation(task, self.id, chunk, rest), 1, LifetimeManager::new())?;
            let ret = resp.raise()?;
            // Response slot 1 echoes the chunk.
            self.assign(task, 2, &mut resp, rest)?;
            last = Some(R::from_slot(ret, resp.objects_mut()).map_err(|err| err.at(0))?);
        }
        Ok(last.assume("a chunk plan is never empty")?)
    }
}

fn chunk_invocation<'a>(
    task: TaskId,
    object: ObjectId,
    chunk: &'a [u8],
    rest: &'a [Arg<'_>],
) -> Invocation<'a> {
    let mut msg = Invocation::new(task, object);
    msg.push(SlotRef::Bytes(chunk));
    for arg in rest {
        msg.push(arg.slot());
    }
    msg
}

impl Drop for ProxyBase {
    fn drop(&mut self) {
        if self.id.is_provider() {
            return;
        }
        self.deletion.on_drop(&self.session, self.id);
        self.session.release(self.id);
    }
}

impl core::fmt::Debug for ProxyBase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProxyBase")
            .field("id", &self.id)
            .field("registered", &self.is_registered())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::{
        error::{DeserializeError, ErrorCode},
        message::Envelope,
        outparam::Region,
        session::{Config, FatalPolicy},
        testing::{Journal, Loopback, echo},
    };

    crate::proxy! {
        struct Widget;
    }

    crate::tasks! {
        enum WidgetTask: 0x0100 {
            Make = 1,
            Poke = 2,
            Read = 3,
            Feed = 4,
            MakeMany = 5,
            Maybe = 6,
        }
    }

    fn session(skeleton: impl FnMut(Envelope) -> Envelope + Send + 'static) -> (Arc<Session>, Journal) {
        let transport = Loopback::new(skeleton);
        let journal = transport.journal();
        let session = Session::new(transport, Config::default().with_fatal_policy(FatalPolicy::Report));
        (session, journal)
    }

    fn created(req: Envelope) -> Envelope {
        echo(req, Some(Slot::Tag(SerializationTag::SkeletonCreated)))
    }

    #[test]
    fn test_registered_proxy_destroyed_once() {
        let (session, journal) = session(created);
        let provider = session.provider();
        let widget: Widget = provider.create(WidgetTask::Make, &mut []).unwrap().unwrap();
        let id = widget.object_id();
        assert!(widget.base().is_registered());
        assert_eq!(session.live_objects(), 1);

        drop(widget);
        assert_eq!(journal.destroyed(), [id]);
        assert_eq!(session.live_objects(), 0);
        drop(provider);
        assert_eq!(journal.destroyed(), [id]);
    }

    #[test]
    fn test_not_created_is_never_destroyed() {
        let (session, journal) = session(|req| {
            echo(req, Some(Slot::Tag(SerializationTag::SkeletonNotCreated)))
        });
        let widget: Option<Widget> = session
            .provider()
            .create(WidgetTask::Make, &mut [])
            .unwrap();
        assert!(widget.is_none());
        assert!(journal.destroyed().is_empty());
        assert_eq!(session.live_objects(), 0);
    }

    #[test]
    fn test_invalid_tag_degrades_to_none() {
        let (session, journal) = session(|req| echo(req, Some(Slot::U8(3))));
        let widget: Option<Widget> = session
            .provider()
            .create(WidgetTask::Make, &mut [])
            .unwrap();
        assert!(widget.is_none());
        assert!(journal.destroyed().is_empty());
    }

    #[test]
    fn test_new_id_is_appended() {
        let (session, journal) = session(created);
        let widget: Widget = session
            .provider()
            .create(WidgetTask::Make, &mut [Arg::value(&5u32)])
            .unwrap()
            .unwrap();
        let req = &journal.requests()[0];
        assert_eq!(req.object, ObjectId::PROVIDER);
        assert_eq!(req.slots, [Slot::U32(5), Slot::Proxy(widget.object_id())]);
    }

    #[test]
    fn test_fallible_factory_failures() {
        let (session, journal) = session(|req| {
            let ret = match req.slots.first() {
                Some(Slot::U32(0)) => Err(ErrorCode::IncompatibleObject),
                _ => Ok(Box::new(Slot::Tag(SerializationTag::SkeletonNotCreated))),
            };
            echo(req, Some(Slot::Fallible(ret)))
        });
        let provider = session.provider();

        let err = provider
            .create_fallible::<Widget>(WidgetTask::Maybe, &mut [Arg::value(&0u32)])
            .unwrap_err();
        assert!(matches!(err, Error::Remote(ErrorCode::IncompatibleObject)));

        let err = provider
            .create_fallible::<Widget>(WidgetTask::Maybe, &mut [Arg::value(&1u32)])
            .unwrap_err();
        assert!(matches!(err, Error::NotCreated));

        assert!(journal.destroyed().is_empty());
        assert_eq!(session.live_objects(), 0);
    }

    #[test]
    fn test_server_error_leaves_out_params() {
        let (session, _) = session(|mut req| {
            if let Some(Slot::MutBytes(buf)) = req.slots.first_mut() {
                buf.fill(0xaa);
            }
            echo(req, Some(Slot::Fallible(Err(ErrorCode::InsufficientCapacity))))
        });
        let mut out = [0u8; 4];
        let mut region = Region::new(&mut out);
        let err = session
            .provider()
            .call_fallible::<()>(WidgetTask::Read, &mut [Arg::out(&mut region)])
            .unwrap_err();
        assert!(matches!(err, Error::Remote(ErrorCode::InsufficientCapacity)));
        assert_eq!(out, [0; 4]);
    }

    #[test]
    fn test_call_returning_and_out_params() {
        let (session, _) = session(|mut req| {
            if let Some(Slot::MutBytes(buf)) = req.slots.get_mut(1) {
                buf.truncate(2);
                buf.copy_from_slice(b"hi");
            }
            echo(req, Some(Slot::U64(2)))
        });
        let mut out = [0u8; 8];
        let mut region = Region::new(&mut out);
        let n: usize = session
            .provider()
            .call_returning(WidgetTask::Read, &mut [Arg::value(&1u32), Arg::out(&mut region)])
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(region.written(), 2);
        assert_eq!(&out[..2], b"hi");
    }

    #[test]
    fn test_mismatched_response_is_reported() {
        let (session, _) = session(|req| Envelope {
            task: TaskId::new(0x0100, 99),
            object: req.object,
            slots: req.slots,
        });
        let err = session.provider().call(WidgetTask::Poke, &mut []).unwrap_err();
        assert!(matches!(
            err,
            Error::Deserialize(DeserializeError::TaskMismatch { .. })
        ));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_create_many_truncates() {
        let (session, journal) = session(|req| {
            let n = match req.slots.last() {
                Some(Slot::List(ids)) => ids.len().min(3),
                _ => 0,
            };
            echo(req, Some(Slot::Fallible(Ok(Box::new(Slot::U64(n as u64))))))
        });
        let mut widgets: Vec<Widget> = Vec::new();
        let n = session
            .provider()
            .create_many(WidgetTask::MakeMany, &mut [], &mut widgets)
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(widgets.len(), 3);
        assert_eq!(session.live_objects(), 3);

        let sent = match journal.requests()[0].slots.last() {
            Some(Slot::List(ids)) => ids.clone(),
            other => panic!("unexpected slot {other:?}"),
        };
        assert_eq!(sent.len(), crate::DEFAULT_MAX_PROXY_BATCH);
        let ids: Vec<_> = widgets.iter().map(Proxy::object_id).map(Slot::Proxy).collect();
        assert_eq!(sent[..3], ids[..]);

        drop(widgets);
        assert_eq!(journal.destroyed().len(), 3);
        assert_eq!(session.live_objects(), 0);
    }

    #[test]
    fn test_transfer_ownership() {
        let (session, journal) = session(created);
        let widget: Widget = session
            .provider()
            .create(WidgetTask::Make, &mut [])
            .unwrap()
            .unwrap();
        let id = widget.into_base().transfer_ownership();
        assert!(!id.is_provider());
        assert!(journal.destroyed().is_empty());
        assert_eq!(session.live_objects(), 0);
    }

    #[test]
    fn test_chunked_call() {
        let (session, journal) = session(|req| {
            let len = match req.slots.first() {
                Some(Slot::Bytes(b)) => b.len() as u64,
                _ => 0,
            };
            echo(req, Some(Slot::Fallible(Ok(Box::new(Slot::U64(len))))))
        });
        let data: Vec<u8> = (0..=255u8).cycle().take(200_000).collect();
        let last: u64 = session
            .provider()
            .call_chunked(WidgetTask::Feed, &data, &mut [Arg::value(&7u32)])
            .unwrap();

        let chunks: Vec<Vec<u8>> = journal
            .requests()
            .into_iter()
            .map(|req| match &req.slots[..] {
                [Slot::Bytes(b), Slot::U32(7)] => b.clone(),
                other => panic!("unexpected slots {other:?}"),
            })
            .collect();
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), data);
        assert_eq!(last, chunks.last().unwrap().len() as u64);
    }

    #[test]
    fn test_chunked_empty_region() {
        let (session, journal) = session(|req| echo(req, Some(Slot::Fallible(Ok(Box::new(Slot::Unit))))));
        session
            .provider()
            .call_chunked::<()>(WidgetTask::Feed, &[], &mut [])
            .unwrap();
        assert_eq!(journal.requests().len(), 1);
        assert_eq!(journal.requests()[0].slots, [Slot::Bytes(Vec::new())]);
    }
}
