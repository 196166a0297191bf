//! Key derivation contexts.

use keyward_ipc::{Arg, Proxy, Result, TaskId, proxy, tasks};

use crate::{
    context::{AlgId, ContextTasks},
    keys::{KeyAttributes, SymmetricKeyProxy},
};

tasks! {
    /// Tasks served by a key derivation context.
    pub enum KdfTask: 0x0005 {
        AlgorithmId = 1,
        IsInitialized = 2,
        AddSalt = 3,
        AddSecretSalt = 4,
        SetSourceKey = 5,
        ConfigureIterations = 6,
        DeriveKey = 7,
        Reset = 8,
    }
}

proxy! {
    /// A key derivation function context.
    pub struct KdfCtxProxy;
}

impl KdfCtxProxy {
    /// Adds public salt.
    pub fn add_salt(&self, salt: &[u8]) -> Result<()> {
        self.base()
            .call_fallible(KdfTask::AddSalt, &mut [Arg::value(salt)])
    }

    /// Adds secret salt held by the server.
    pub fn add_secret_salt(&self, salt: &SymmetricKeyProxy) -> Result<()> {
        self.base()
            .call_fallible(KdfTask::AddSecretSalt, &mut [Arg::object(salt)])
    }

    /// Sets the key material to derive from.
    pub fn set_source_key(&self, key: &SymmetricKeyProxy) -> Result<()> {
        self.base()
            .call_fallible(KdfTask::SetSourceKey, &mut [Arg::object(key)])
    }

    /// Requests `iterations` rounds, zero meaning the
    /// algorithm's default, and returns the number the server
    /// will actually use.
    pub fn configure_iterations(&self, iterations: u32) -> Result<u32> {
        self.base()
            .call_returning(KdfTask::ConfigureIterations, &mut [Arg::value(&iterations)])
    }

    /// Derives a key for `target` from the source key, the salt
    /// and `label`.
    pub fn derive_key(
        &self,
        target: AlgId,
        label: &[u8],
        attrs: KeyAttributes,
    ) -> Result<SymmetricKeyProxy> {
        self.base().create_fallible(
            KdfTask::DeriveKey,
            &mut [
                Arg::value(&target),
                Arg::value(label),
                Arg::value(&attrs.is_session),
                Arg::value(&attrs.is_exportable),
            ],
        )
    }

    /// Clears the source key, salt and iteration count.
    pub fn reset(&self) -> Result<()> {
        self.base().call_fallible(KdfTask::Reset, &mut [])
    }
}

impl ContextTasks for KdfCtxProxy {
    const ALGORITHM_ID: TaskId = KdfTask::AlgorithmId.id();
    const IS_INITIALIZED: TaskId = KdfTask::IsInitialized.id();
}
