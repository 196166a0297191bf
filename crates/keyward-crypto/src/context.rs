//! Capabilities shared by cryptographic contexts.
//!
//! Contexts are described by small capability traits instead of
//! one wide interface. [`CryptoContext`] is the shared base;
//! [`StreamStarting`], [`BufferedDigest`] and [`KeyedContext`]
//! build on it. A MAC context is both keyed and digesting, and
//! its base is still implemented exactly once.
//!
//! Proxies opt into a capability by naming the task ids that
//! serve it ([`ContextTasks`], [`StreamTasks`], [`DigestTasks`],
//! [`KeyedTasks`]); the blanket impls below do the rest.

use keyward_ipc::{Arg, Proxy, Region, Result, TaskId};

use crate::keys::SymmetricKeyProxy;

/// A cryptographic algorithm identifier.
pub type AlgId = u64;

/// The algorithm id of "no algorithm".
pub const ALG_ID_UNDEFINED: AlgId = 0;

/// The base of every cryptographic context.
pub trait CryptoContext {
    /// Returns the context's algorithm.
    fn algorithm_id(&self) -> Result<AlgId>;

    /// Reports whether the context is ready for use.
    fn is_initialized(&self) -> Result<bool>;
}

/// A context that processes a stream after an explicit start.
pub trait StreamStarting: CryptoContext {
    /// Starts a new stream with an initialization vector, which
    /// may be empty.
    fn start(&self, iv: &[u8]) -> Result<()>;

    /// Reports whether a stream has been started.
    fn is_started(&self) -> Result<bool>;
}

/// A context that buffers its input and produces a digest.
pub trait BufferedDigest: StreamStarting {
    /// Absorbs `data`, which may be of any size.
    fn update(&self, data: &[u8]) -> Result<()>;

    /// Absorbs a single byte.
    fn update_byte(&self, byte: u8) -> Result<()>;

    /// Completes the stream and returns the digest.
    fn finish(&self) -> Result<Vec<u8>>;

    /// Copies the digest, starting at byte `offset`, into `out`
    /// and returns the number of bytes copied.
    fn get_digest(&self, out: &mut [u8], offset: u64) -> Result<usize>;

    /// Returns the size of the digest.
    fn digest_size(&self) -> Result<usize>;
}

/// A context that operates with a symmetric key.
pub trait KeyedContext: CryptoContext {
    /// Sets the key.
    fn set_key(&self, key: &SymmetricKeyProxy) -> Result<()>;

    /// Clears the key and any buffered state.
    fn reset(&self) -> Result<()>;
}

/// Task ids serving [`CryptoContext`].
pub trait ContextTasks: Proxy {
    /// Serves [`CryptoContext::algorithm_id`].
    const ALGORITHM_ID: TaskId;
    /// Serves [`CryptoContext::is_initialized`].
    const IS_INITIALIZED: TaskId;
}

/// Task ids serving [`StreamStarting`].
pub trait StreamTasks: ContextTasks {
    /// Serves [`StreamStarting::start`].
    const START: TaskId;
    /// Serves [`StreamStarting::is_started`].
    const IS_STARTED: TaskId;
}

/// Task ids serving [`BufferedDigest`].
pub trait DigestTasks: StreamTasks {
    /// Serves [`BufferedDigest::update`].
    const UPDATE: TaskId;
    /// Serves [`BufferedDigest::update_byte`].
    const UPDATE_BYTE: TaskId;
    /// Serves [`BufferedDigest::finish`].
    const FINISH: TaskId;
    /// Serves [`BufferedDigest::get_digest`].
    const GET_DIGEST: TaskId;
    /// Serves [`BufferedDigest::digest_size`].
    const DIGEST_SIZE: TaskId;
}

/// Task ids serving [`KeyedContext`].
pub trait KeyedTasks: ContextTasks {
    /// Serves [`KeyedContext::set_key`].
    const SET_KEY: TaskId;
    /// Serves [`KeyedContext::reset`].
    const RESET: TaskId;
}

impl<T: ContextTasks> CryptoContext for T {
    fn algorithm_id(&self) -> Result<AlgId> {
        self.base().call_returning(T::ALGORITHM_ID, &mut [])
    }

    fn is_initialized(&self) -> Result<bool> {
        self.base().call_returning(T::IS_INITIALIZED, &mut [])
    }
}

impl<T: StreamTasks> StreamStarting for T {
    fn start(&self, iv: &[u8]) -> Result<()> {
        self.base().call_fallible(T::START, &mut [Arg::value(iv)])
    }

    fn is_started(&self) -> Result<bool> {
        self.base().call_returning(T::IS_STARTED, &mut [])
    }
}

impl<T: DigestTasks> BufferedDigest for T {
    fn update(&self, data: &[u8]) -> Result<()> {
        self.base().call_chunked(T::UPDATE, data, &mut [])
    }

    fn update_byte(&self, byte: u8) -> Result<()> {
        self.base()
            .call_fallible(T::UPDATE_BYTE, &mut [Arg::value(&byte)])
    }

    fn finish(&self) -> Result<Vec<u8>> {
        self.base().call_fallible(T::FINISH, &mut [])
    }

    fn get_digest(&self, out: &mut [u8], offset: u64) -> Result<usize> {
        let mut region = Region::new(out);
        self.base().call_fallible(
            T::GET_DIGEST,
            &mut [Arg::out(&mut region), Arg::value(&offset)],
        )
    }

    fn digest_size(&self) -> Result<usize> {
        self.base().call_returning(T::DIGEST_SIZE, &mut [])
    }
}

impl<T: KeyedTasks> KeyedContext for T {
    fn set_key(&self, key: &SymmetricKeyProxy) -> Result<()> {
        self.base().call_fallible(T::SET_KEY, &mut [Arg::object(key)])
    }

    fn reset(&self) -> Result<()> {
        self.base().call_fallible(T::RESET, &mut [])
    }
}
