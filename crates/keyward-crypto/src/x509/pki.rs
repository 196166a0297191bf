use keyward_ipc::{Arg, Proxy, Result, proxy, tasks};

use crate::{context::AlgId, keys::DomainParametersProxy};

tasks! {
    /// Tasks served by a subject public key info.
    pub enum PublicKeyInfoTask: 0x0010 {
        PublicKeyAlgId = 1,
        SignatureAlgId = 2,
        RequiredHashAlgId = 3,
        RequiredHashSize = 4,
        Export = 5,
        DomainParameters = 6,
    }
}

proxy! {
    /// The subject public key info of a certificate or
    /// certificate request.
    pub struct PublicKeyInfoProxy;
}

impl PublicKeyInfoProxy {
    /// Returns the public key's algorithm.
    pub fn public_key_alg_id(&self) -> Result<AlgId> {
        self.base()
            .call_returning(PublicKeyInfoTask::PublicKeyAlgId, &mut [])
    }

    /// Returns the signature algorithm the key is meant for.
    pub fn signature_alg_id(&self) -> Result<AlgId> {
        self.base()
            .call_returning(PublicKeyInfoTask::SignatureAlgId, &mut [])
    }

    /// Returns the hash algorithm signatures must use.
    pub fn required_hash_alg_id(&self) -> Result<AlgId> {
        self.base()
            .call_returning(PublicKeyInfoTask::RequiredHashAlgId, &mut [])
    }

    /// Returns the hash size signatures must use.
    pub fn required_hash_size(&self) -> Result<usize> {
        self.base()
            .call_returning(PublicKeyInfoTask::RequiredHashSize, &mut [])
    }

    /// Replaces `out` with the DER encoding of the key info.
    pub fn export(&self, out: &mut Vec<u8>) -> Result<()> {
        self.base()
            .call_fallible(PublicKeyInfoTask::Export, &mut [Arg::out(out)])
    }

    /// Returns the key's domain parameters, if the algorithm
    /// has any.
    pub fn domain_parameters(&self) -> Result<Option<DomainParametersProxy>> {
        self.base()
            .create(PublicKeyInfoTask::DomainParameters, &mut [])
    }
}
