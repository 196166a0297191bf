//! The state shared by every proxy on one channel.

use std::{process, sync::Arc};

use spin::Mutex;
use tracing::{error, warn};

use crate::{
    error::{Error, Result},
    id::{ObjectId, ObjectTable},
    message::Invocation,
    proxy::ProxyBase,
    task::TaskId,
    transport::{Channel, ChannelGuard, Transport},
};

/// The default number of proxies reserved by a call that
/// returns a list of proxies.
pub const DEFAULT_MAX_PROXY_BATCH: usize = 32;

/// What to do when the channel can no longer be trusted.
///
/// A failed send or receive, a request that cannot be
/// serialized, or an out parameter that cannot hold its answer
/// all leave the client and server with different views of
/// the objects they share. There is no protocol to resynchronize
/// them.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum FatalPolicy {
    /// Log the error and abort the process.
    #[default]
    Abort,
    /// Return the error to the caller.
    ///
    /// The caller must assume nothing about how much of the
    /// call the server completed and should discard the
    /// session.
    Report,
}

/// Session configuration.
#[derive(Clone, Debug)]
pub struct Config {
    fatal_policy: FatalPolicy,
    max_proxy_batch: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fatal_policy: FatalPolicy::default(),
            max_proxy_batch: DEFAULT_MAX_PROXY_BATCH,
        }
    }
}

impl Config {
    /// Sets the [`FatalPolicy`].
    pub fn with_fatal_policy(mut self, policy: FatalPolicy) -> Self {
        self.fatal_policy = policy;
        self
    }

    /// Sets how many proxies a list-returning call reserves.
    pub fn with_max_proxy_batch(mut self, n: usize) -> Self {
        self.max_proxy_batch = n;
        self
    }

    /// Returns the [`FatalPolicy`].
    pub const fn fatal_policy(&self) -> FatalPolicy {
        self.fatal_policy
    }

    /// Returns how many proxies a list-returning call reserves.
    pub const fn max_proxy_batch(&self) -> usize {
        self.max_proxy_batch
    }
}

/// A connection to one server process.
///
/// Owns the channel and mints the ids of every proxy created
/// through it. Proxies keep the session alive.
pub struct Session {
    channel: Channel,
    objects: Mutex<ObjectTable>,
    config: Config,
}

impl Session {
    /// Creates a session over `transport`.
    pub fn new<T>(transport: T, config: Config) -> Arc<Self>
    where
        T: Transport + 'static,
    {
        Arc::new(Self {
            channel: Channel::new(Box::new(transport)),
            objects: Mutex::new(ObjectTable::new()),
            config,
        })
    }

    /// Returns a proxy base for provider-level calls.
    pub fn provider(self: &Arc<Self>) -> ProxyBase {
        ProxyBase::provider(self)
    }

    /// Returns the session's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the number of proxies that currently hold an id.
    pub fn live_objects(&self) -> usize {
        self.objects.lock().live()
    }

    /// Returns the largest request the transport accepts.
    pub fn request_capacity(&self) -> usize {
        self.channel.capacity()
    }

    pub(crate) fn allocate(&self) -> Result<ObjectId> {
        Ok(self.objects.lock().allocate()?)
    }

    pub(crate) fn release(&self, id: ObjectId) {
        if !self.objects.lock().release(id) {
            warn!(%id, "released an id that was not live");
        }
    }

    /// Holds the channel until the guard is dropped.
    pub(crate) fn lock(&self) -> ChannelGuard<'_> {
        self.channel.lock()
    }

    /// Performs one round trip, applying the fatal policy to
    /// channel failures.
    pub(crate) fn round_trip(&self, msg: &Invocation<'_>) -> Result<Vec<u8>> {
        self.channel
            .round_trip(msg)
            .map_err(|err| self.escalate(msg.task(), err))
    }

    /// Applies the fatal policy to `err`.
    pub(crate) fn escalate(&self, task: TaskId, err: Error) -> Error {
        if !err.is_fatal() {
            return err;
        }
        error!(%task, cause = %err, "ipc channel is no longer usable");
        if self.config.fatal_policy == FatalPolicy::Abort {
            process::abort();
        }
        err
    }

    /// Tells the server that `id` was destroyed.
    ///
    /// The response carries nothing and is not inspected.
    pub(crate) fn notify_destroyed(&self, id: ObjectId) -> Result<()> {
        let msg = Invocation::new(TaskId::DESTROY, id);
        self.round_trip(&msg)?;
        Ok(())
    }
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("live_objects", &self.live_objects())
            .finish_non_exhaustive()
    }
}
