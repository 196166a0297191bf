//! The crypto provider.

use std::sync::Arc;

use keyward_ipc::{Arg, Proxy, ProxyBase, Result, Session, tasks};

use crate::{
    agreement::KeyAgreementPrivateCtxProxy,
    cipher::StreamCipherCtxProxy,
    context::AlgId,
    hash::HashCtxProxy,
    kdf::KdfCtxProxy,
    keys::{KeyAttributes, PrivateKeyProxy, SymmetricKeyProxy},
    keystore::KeyStorageProviderProxy,
    mac::MacCtxProxy,
    rng::RngCtxProxy,
    signer::SignerPrivateCtxProxy,
    x509::X509ProviderProxy,
};

tasks! {
    /// Tasks served by the crypto provider.
    pub enum ProviderTask: 0x0001 {
        AlgIdByName = 1,
        AlgName = 2,
        CreateHashCtx = 3,
        CreateMacCtx = 4,
        CreateStreamCipherCtx = 5,
        CreateKdfCtx = 6,
        CreateSignerPrivateCtx = 7,
        CreateKeyAgreementPrivateCtx = 8,
        CreateRngCtx = 9,
        GeneratePrivateKey = 10,
        GenerateSymmetricKey = 11,
        X509Provider = 12,
        KeyStorageProvider = 13,
    }
}

/// The root of every server object.
///
/// Calls go to the provider object, which the server creates
/// with the session and never destroys.
#[derive(Debug)]
pub struct CryptoProviderProxy(ProxyBase);

impl CryptoProviderProxy {
    /// Creates the provider for `session`.
    pub fn new(session: &Arc<Session>) -> Self {
        Self(session.provider())
    }

    /// Returns the session.
    pub fn session(&self) -> &Arc<Session> {
        self.0.session()
    }

    /// Looks up an algorithm by its name.
    ///
    /// Returns [`ALG_ID_UNDEFINED`][crate::ALG_ID_UNDEFINED] if the
    /// name is unknown.
    pub fn alg_id_by_name(&self, name: &str) -> Result<AlgId> {
        self.0
            .call_returning(ProviderTask::AlgIdByName, &mut [Arg::value(name)])
    }

    /// Returns the name of algorithm `id`.
    pub fn alg_name(&self, id: AlgId) -> Result<String> {
        self.0
            .call_fallible(ProviderTask::AlgName, &mut [Arg::value(&id)])
    }

    /// Creates a hash context.
    pub fn create_hash_ctx(&self, alg: AlgId) -> Result<HashCtxProxy> {
        self.create(ProviderTask::CreateHashCtx, alg)
    }

    /// Creates a MAC context.
    pub fn create_mac_ctx(&self, alg: AlgId) -> Result<MacCtxProxy> {
        self.create(ProviderTask::CreateMacCtx, alg)
    }

    /// Creates a stream cipher context.
    pub fn create_stream_cipher_ctx(&self, alg: AlgId) -> Result<StreamCipherCtxProxy> {
        self.create(ProviderTask::CreateStreamCipherCtx, alg)
    }

    /// Creates a key derivation context.
    pub fn create_kdf_ctx(&self, alg: AlgId) -> Result<KdfCtxProxy> {
        self.create(ProviderTask::CreateKdfCtx, alg)
    }

    /// Creates a private-key signing context.
    pub fn create_signer_private_ctx(&self, alg: AlgId) -> Result<SignerPrivateCtxProxy> {
        self.create(ProviderTask::CreateSignerPrivateCtx, alg)
    }

    /// Creates a private-key agreement context.
    pub fn create_key_agreement_private_ctx(
        &self,
        alg: AlgId,
    ) -> Result<KeyAgreementPrivateCtxProxy> {
        self.create(ProviderTask::CreateKeyAgreementPrivateCtx, alg)
    }

    /// Creates a random number generator.
    pub fn create_rng_ctx(&self, alg: AlgId) -> Result<RngCtxProxy> {
        self.create(ProviderTask::CreateRngCtx, alg)
    }

    /// Generates a private key.
    pub fn generate_private_key(&self, alg: AlgId, attrs: KeyAttributes) -> Result<PrivateKeyProxy> {
        self.generate(ProviderTask::GeneratePrivateKey, alg, attrs)
    }

    /// Generates a symmetric key.
    pub fn generate_symmetric_key(
        &self,
        alg: AlgId,
        attrs: KeyAttributes,
    ) -> Result<SymmetricKeyProxy> {
        self.generate(ProviderTask::GenerateSymmetricKey, alg, attrs)
    }

    /// Returns the X.509 provider.
    pub fn x509_provider(&self) -> Result<X509ProviderProxy> {
        self.0.create_fallible(ProviderTask::X509Provider, &mut [])
    }

    /// Returns the key storage provider.
    pub fn key_storage_provider(&self) -> Result<KeyStorageProviderProxy> {
        self.0
            .create_fallible(ProviderTask::KeyStorageProvider, &mut [])
    }

    fn create<P: Proxy>(&self, task: ProviderTask, alg: AlgId) -> Result<P> {
        self.0.create_fallible(task, &mut [Arg::value(&alg)])
    }

    fn generate<P: Proxy>(&self, task: ProviderTask, alg: AlgId, attrs: KeyAttributes) -> Result<P> {
        self.0.create_fallible(
            task,
            &mut [
                Arg::value(&alg),
                Arg::value(&attrs.is_session),
                Arg::value(&attrs.is_exportable),
            ],
        )
    }
}
