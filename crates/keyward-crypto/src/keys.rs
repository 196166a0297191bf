//! Keys and domain parameters.

use keyward_ipc::{Arg, Proxy, Result, proxy, tasks};

use crate::context::AlgId;

/// How a new key may be used.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct KeyAttributes {
    /// The key only lives as long as the session.
    pub is_session: bool,
    /// The key may leave the server.
    pub is_exportable: bool,
}

tasks! {
    /// Tasks served by a private key.
    pub enum PrivateKeyTask: 0x0009 {
        AlgorithmId = 1,
        IsExportable = 2,
        IsSession = 3,
        PublicKeyBytes = 4,
        DomainParameters = 5,
    }
}

proxy! {
    /// A private key held by the server.
    pub struct PrivateKeyProxy;
}

impl PrivateKeyProxy {
    /// Returns the key's algorithm.
    pub fn algorithm_id(&self) -> Result<AlgId> {
        self.base()
            .call_returning(PrivateKeyTask::AlgorithmId, &mut [])
    }

    /// Reports whether the key may leave the server.
    pub fn is_exportable(&self) -> Result<bool> {
        self.base()
            .call_returning(PrivateKeyTask::IsExportable, &mut [])
    }

    /// Reports whether the key only lives as long as the
    /// session.
    pub fn is_session(&self) -> Result<bool> {
        self.base()
            .call_returning(PrivateKeyTask::IsSession, &mut [])
    }

    /// Returns the encoded public half of the key.
    pub fn public_key_bytes(&self) -> Result<Vec<u8>> {
        self.base()
            .call_fallible(PrivateKeyTask::PublicKeyBytes, &mut [])
    }

    /// Returns the key's domain parameters, if the algorithm
    /// has any.
    pub fn domain_parameters(&self) -> Result<Option<DomainParametersProxy>> {
        self.base()
            .create(PrivateKeyTask::DomainParameters, &mut [])
    }
}

tasks! {
    /// Tasks served by a symmetric key.
    pub enum SymmetricKeyTask: 0x000a {
        AlgorithmId = 1,
        IsExportable = 2,
        IsSession = 3,
        KeySize = 4,
    }
}

proxy! {
    /// A symmetric key held by the server.
    pub struct SymmetricKeyProxy;
}

impl SymmetricKeyProxy {
    /// Returns the key's algorithm.
    pub fn algorithm_id(&self) -> Result<AlgId> {
        self.base()
            .call_returning(SymmetricKeyTask::AlgorithmId, &mut [])
    }

    /// Reports whether the key may leave the server.
    pub fn is_exportable(&self) -> Result<bool> {
        self.base()
            .call_returning(SymmetricKeyTask::IsExportable, &mut [])
    }

    /// Reports whether the key only lives as long as the
    /// session.
    pub fn is_session(&self) -> Result<bool> {
        self.base()
            .call_returning(SymmetricKeyTask::IsSession, &mut [])
    }

    /// Returns the key size in bits.
    pub fn key_size(&self) -> Result<u32> {
        self.base()
            .call_returning(SymmetricKeyTask::KeySize, &mut [])
    }
}

tasks! {
    /// Tasks served by a set of domain parameters.
    pub enum DomainParametersTask: 0x000b {
        AlgorithmId = 1,
        IsSecret = 2,
        ExportPublic = 3,
        UniqueName = 4,
    }
}

proxy! {
    /// Domain parameters held by the server.
    pub struct DomainParametersProxy;
}

impl DomainParametersProxy {
    /// Returns the algorithm the parameters belong to.
    pub fn algorithm_id(&self) -> Result<AlgId> {
        self.base()
            .call_returning(DomainParametersTask::AlgorithmId, &mut [])
    }

    /// Reports whether the parameters are secret.
    pub fn is_secret(&self) -> Result<bool> {
        self.base()
            .call_returning(DomainParametersTask::IsSecret, &mut [])
    }

    /// Replaces `out` with the public encoding of the
    /// parameters.
    pub fn export_public(&self, out: &mut Vec<u8>) -> Result<()> {
        self.base()
            .call_fallible(DomainParametersTask::ExportPublic, &mut [Arg::out(out)])
    }

    /// Replaces `out` with the parameters' well-known name.
    ///
    /// Fails if the parameters have no name.
    pub fn unique_name(&self, out: &mut String) -> Result<()> {
        self.base()
            .call_fallible(DomainParametersTask::UniqueName, &mut [Arg::out(out)])
    }
}
