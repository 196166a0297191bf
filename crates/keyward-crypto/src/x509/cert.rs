use std::sync::OnceLock;

use keyward_ipc::{Arg, Proxy, ProxyBase, Region, Result, tasks};

use super::{dn::X509DnProxy, nested, pki::PublicKeyInfoProxy};

tasks! {
    /// Tasks served by a certificate.
    pub enum CertificateTask: 0x000d {
        Version = 1,
        SerialNumber = 2,
        SubjectPki = 3,
        SubjectDn = 4,
        IssuerDn = 5,
        StartTime = 6,
        EndTime = 7,
        IsRoot = 8,
        VerifyMe = 9,
        Export = 10,
    }
}

/// An X.509 certificate parsed by the server.
///
/// The subject and issuer names and the subject public key info
/// are fetched on first use and kept for the certificate's
/// lifetime.
#[derive(Debug)]
pub struct CertificateProxy {
    // Dropped before `base` so nested objects are destroyed
    // before their parent.
    subject_pki: OnceLock<PublicKeyInfoProxy>,
    subject_dn: OnceLock<X509DnProxy>,
    issuer_dn: OnceLock<X509DnProxy>,
    base: ProxyBase,
}

impl Proxy for CertificateProxy {
    fn from_base(base: ProxyBase) -> Self {
        Self {
            subject_pki: OnceLock::new(),
            subject_dn: OnceLock::new(),
            issuer_dn: OnceLock::new(),
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

impl CertificateProxy {
    /// Returns the X.509 version.
    pub fn version(&self) -> Result<u32> {
        self.base.call_returning(CertificateTask::Version, &mut [])
    }

    /// Copies the serial number into `out` and returns its
    /// length.
    pub fn serial_number(&self, out: &mut [u8]) -> Result<usize> {
        let mut region = Region::new(out);
        self.base
            .call_fallible(CertificateTask::SerialNumber, &mut [Arg::out(&mut region)])
    }

    /// Returns the subject public key info.
    pub fn subject_pki(&self) -> Result<&PublicKeyInfoProxy> {
        nested(&self.base, &self.subject_pki, CertificateTask::SubjectPki)
    }

    /// Returns the subject name.
    pub fn subject_dn(&self) -> Result<&X509DnProxy> {
        nested(&self.base, &self.subject_dn, CertificateTask::SubjectDn)
    }

    /// Returns the issuer name.
    pub fn issuer_dn(&self) -> Result<&X509DnProxy> {
        nested(&self.base, &self.issuer_dn, CertificateTask::IssuerDn)
    }

    /// Returns the start of the validity period in seconds since
    /// the Unix epoch.
    pub fn start_time(&self) -> Result<i64> {
        self.base.call_returning(CertificateTask::StartTime, &mut [])
    }

    /// Returns the end of the validity period in seconds since
    /// the Unix epoch.
    pub fn end_time(&self) -> Result<i64> {
        self.base.call_returning(CertificateTask::EndTime, &mut [])
    }

    /// Reports whether the certificate is self-signed.
    pub fn is_root(&self) -> Result<bool> {
        self.base.call_returning(CertificateTask::IsRoot, &mut [])
    }

    /// Verifies the certificate's signature with the key of
    /// `ca`, or with its own key if `ca` is `None`.
    pub fn verify_me(&self, ca: Option<&CertificateProxy>) -> Result<bool> {
        let ca = ca.map(Proxy::object_id);
        self.base
            .call_returning(CertificateTask::VerifyMe, &mut [Arg::value(&ca)])
    }

    /// Replaces `out` with the DER encoding of the certificate.
    pub fn export(&self, out: &mut Vec<u8>) -> Result<()> {
        self.base
            .call_fallible(CertificateTask::Export, &mut [Arg::out(out)])
    }
}
