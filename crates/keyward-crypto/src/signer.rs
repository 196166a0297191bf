//! Signing contexts and signatures.

use keyward_ipc::{Arg, Proxy, Result, TaskId, proxy, tasks};

use crate::{
    context::{AlgId, ContextTasks},
    hash::HashCtxProxy,
    keys::PrivateKeyProxy,
};

tasks! {
    /// Tasks served by a private-key signing context.
    pub enum SignerTask: 0x0006 {
        AlgorithmId = 1,
        IsInitialized = 2,
        SetKey = 3,
        Reset = 4,
        Sign = 5,
        SignPreHashed = 6,
    }
}

proxy! {
    /// A signing context that uses a private key.
    pub struct SignerPrivateCtxProxy;
}

impl SignerPrivateCtxProxy {
    /// Sets the signing key.
    pub fn set_key(&self, key: &PrivateKeyProxy) -> Result<()> {
        self.base()
            .call_fallible(SignerTask::SetKey, &mut [Arg::object(key)])
    }

    /// Clears the key.
    pub fn reset(&self) -> Result<()> {
        self.base().call_fallible(SignerTask::Reset, &mut [])
    }

    /// Signs `value` with an optional `context` string.
    pub fn sign(&self, value: &[u8], context: &[u8]) -> Result<SignatureProxy> {
        self.base().create_fallible(
            SignerTask::Sign,
            &mut [Arg::value(value), Arg::value(context)],
        )
    }

    /// Signs the digest computed by a finished `hash` context.
    pub fn sign_pre_hashed(&self, hash: &HashCtxProxy, context: &[u8]) -> Result<SignatureProxy> {
        self.base().create_fallible(
            SignerTask::SignPreHashed,
            &mut [Arg::object(hash), Arg::value(context)],
        )
    }
}

impl ContextTasks for SignerPrivateCtxProxy {
    const ALGORITHM_ID: TaskId = SignerTask::AlgorithmId.id();
    const IS_INITIALIZED: TaskId = SignerTask::IsInitialized.id();
}

tasks! {
    /// Tasks served by a signature.
    pub enum SignatureTask: 0x0007 {
        AlgorithmId = 1,
        HashAlgorithmId = 2,
        RequiredHashSize = 3,
        Value = 4,
    }
}

proxy! {
    /// A signature or MAC tag held by the server.
    pub struct SignatureProxy;
}

impl SignatureProxy {
    /// Returns the signature algorithm.
    pub fn algorithm_id(&self) -> Result<AlgId> {
        self.base()
            .call_returning(SignatureTask::AlgorithmId, &mut [])
    }

    /// Returns the hash algorithm used to make the signature.
    pub fn hash_algorithm_id(&self) -> Result<AlgId> {
        self.base()
            .call_returning(SignatureTask::HashAlgorithmId, &mut [])
    }

    /// Returns the size of the hash the signature covers.
    pub fn required_hash_size(&self) -> Result<usize> {
        self.base()
            .call_returning(SignatureTask::RequiredHashSize, &mut [])
    }

    /// Returns the encoded signature.
    pub fn value(&self) -> Result<Vec<u8>> {
        self.base().call_fallible(SignatureTask::Value, &mut [])
    }
}
