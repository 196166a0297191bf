use std::sync::OnceLock;

use keyward_ipc::{Arg, Proxy, ProxyBase, Result, tasks};

use super::{dn::X509DnProxy, nested, pki::PublicKeyInfoProxy};
use crate::context::AlgId;

tasks! {
    /// Tasks served by a certificate signing request.
    pub enum CertRequestTask: 0x000e {
        Version = 1,
        SubjectPki = 2,
        SubjectDn = 3,
        SignatureAlgId = 4,
        Verify = 5,
        Export = 6,
    }
}

/// A certificate signing request parsed by the server.
///
/// The subject name and public key info are fetched on first
/// use and kept for the request's lifetime.
#[derive(Debug)]
pub struct CertRequestProxy {
    subject_pki: OnceLock<PublicKeyInfoProxy>,
    subject_dn: OnceLock<X509DnProxy>,
    base: ProxyBase,
}

impl Proxy for CertRequestProxy {
    fn from_base(base: ProxyBase) -> Self {
        Self {
            subject_pki: OnceLock::new(),
            subject_dn: OnceLock::new(),
            base,
        }
    }

    fn base(&self) -> &ProxyBase {
        &self.base
    }

    fn into_base(self) -> ProxyBase {
        self.base
    }
}

impl CertRequestProxy {
    /// Returns the request format version.
    pub fn version(&self) -> Result<u32> {
        self.base.call_returning(CertRequestTask::Version, &mut [])
    }

    /// Returns the subject public key info.
    pub fn subject_pki(&self) -> Result<&PublicKeyInfoProxy> {
        nested(&self.base, &self.subject_pki, CertRequestTask::SubjectPki)
    }

    /// Returns the subject name.
    pub fn subject_dn(&self) -> Result<&X509DnProxy> {
        nested(&self.base, &self.subject_dn, CertRequestTask::SubjectDn)
    }

    /// Returns the algorithm the request was signed with.
    pub fn signature_alg_id(&self) -> Result<AlgId> {
        self.base
            .call_returning(CertRequestTask::SignatureAlgId, &mut [])
    }

    /// Checks the request's self-signature.
    pub fn verify(&self) -> Result<bool> {
        self.base.call_returning(CertRequestTask::Verify, &mut [])
    }

    /// Replaces `out` with the DER encoding of the request.
    pub fn export(&self, out: &mut Vec<u8>) -> Result<()> {
        self.base
            .call_fallible(CertRequestTask::Export, &mut [Arg::out(out)])
    }
}
