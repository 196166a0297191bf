//! Key agreement contexts.

use keyward_ipc::{Arg, Proxy, Result, TaskId, proxy, tasks};

use crate::{
    context::{AlgId, ContextTasks},
    keys::{KeyAttributes, PrivateKeyProxy, SymmetricKeyProxy},
};

tasks! {
    /// Tasks served by a private-key agreement context.
    pub enum KeyAgreementTask: 0x0013 {
        AlgorithmId = 1,
        IsInitialized = 2,
        SetKey = 3,
        Reset = 4,
        AgreeKey = 5,
    }
}

proxy! {
    /// A key agreement context that uses a private key.
    pub struct KeyAgreementPrivateCtxProxy;
}

impl KeyAgreementPrivateCtxProxy {
    /// Sets the local private key.
    pub fn set_key(&self, key: &PrivateKeyProxy) -> Result<()> {
        self.base()
            .call_fallible(KeyAgreementTask::SetKey, &mut [Arg::object(key)])
    }

    /// Clears the key.
    pub fn reset(&self) -> Result<()> {
        self.base().call_fallible(KeyAgreementTask::Reset, &mut [])
    }

    /// Agrees on a key for `target` with the owner of the
    /// encoded public key `peer`.
    pub fn agree_key(
        &self,
        peer: &[u8],
        target: AlgId,
        attrs: KeyAttributes,
    ) -> Result<SymmetricKeyProxy> {
        self.base().create_fallible(
            KeyAgreementTask::AgreeKey,
            &mut [
                Arg::value(peer),
                Arg::value(&target),
                Arg::value(&attrs.is_session),
                Arg::value(&attrs.is_exportable),
            ],
        )
    }
}

impl ContextTasks for KeyAgreementPrivateCtxProxy {
    const ALGORITHM_ID: TaskId = KeyAgreementTask::AlgorithmId.id();
    const IS_INITIALIZED: TaskId = KeyAgreementTask::IsInitialized.id();
}
