//! X.509 certificates, requests and names.
//!
//! Parsing happens on the server. DER input of any size is
//! staged in chunks first and then parsed by a single factory
//! call, all while the channel is held.

mod cert;
mod dn;
mod pki;
mod request;

use std::sync::OnceLock;

use keyward_ipc::{Arg, Proxy, ProxyBase, Result, TaskId, proxy, tasks};
use tracing::debug;

pub use self::{
    cert::{CertificateProxy, CertificateTask},
    dn::{AttributeId, X509DnProxy, X509DnTask},
    pki::{PublicKeyInfoProxy, PublicKeyInfoTask},
    request::{CertRequestProxy, CertRequestTask},
};

/// Returns the proxy in `cell`, creating it with `task` on first
/// use.
fn nested<'a, P: Proxy>(
    base: &ProxyBase,
    cell: &'a OnceLock<P>,
    task: impl Into<TaskId>,
) -> Result<&'a P> {
    if let Some(p) = cell.get() {
        return Ok(p);
    }
    let task = task.into();
    base.with_channel(|base| {
        // Another thread may have won while we waited.
        if let Some(p) = cell.get() {
            return Ok(p);
        }
        let p = base.create_fallible(task, &mut [])?;
        Ok(cell.get_or_init(|| p))
    })
}

tasks! {
    /// Tasks served by the X.509 provider.
    pub enum X509Task: 0x000c {
        CreateEmptyDn = 1,
        StageDer = 2,
        ParseStagedCert = 3,
        ParseStagedCertRequest = 4,
        FindCertByDn = 5,
        FindCertsBySubject = 6,
        Import = 7,
        Remove = 8,
    }
}

/// How a parsed certificate is kept by the server.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Persistence {
    /// Dropped with the proxy.
    #[default]
    Session,
    /// Stored until removed.
    Persistent,
}

proxy! {
    /// The server's X.509 provider.
    pub struct X509ProviderProxy;
}

impl X509ProviderProxy {
    /// Creates an empty distinguished name.
    pub fn create_empty_dn(&self, capacity: usize) -> Result<X509DnProxy> {
        self.base()
            .create_fallible(X509Task::CreateEmptyDn, &mut [Arg::value(&capacity)])
    }

    /// Parses a DER encoded certificate.
    pub fn parse_cert(&self, der: &[u8], persistence: Persistence) -> Result<CertificateProxy> {
        let persistent = persistence == Persistence::Persistent;
        self.base().with_channel(|base| {
            base.call_chunked::<()>(X509Task::StageDer, der, &mut [])?;
            base.create_fallible(X509Task::ParseStagedCert, &mut [Arg::value(&persistent)])
        })
    }

    /// Parses a DER encoded certificate signing request.
    pub fn parse_cert_request(&self, der: &[u8]) -> Result<CertRequestProxy> {
        self.base().with_channel(|base| {
            base.call_chunked::<()>(X509Task::StageDer, der, &mut [])?;
            base.create_fallible(X509Task::ParseStagedCertRequest, &mut [])
        })
    }

    /// Finds a stored certificate with the given subject and
    /// issuer names.
    ///
    /// `hint` is where the search starts; on success it is
    /// updated to where the next search should start. A `None`
    /// hint searches from the start and is left alone.
    pub fn find_cert_by_dn(
        &self,
        subject: &X509DnProxy,
        issuer: &X509DnProxy,
        hint: &mut Option<u32>,
    ) -> Result<Option<CertificateProxy>> {
        let found = self.base().create(
            X509Task::FindCertByDn,
            &mut [Arg::object(subject), Arg::object(issuer), Arg::out(hint)],
        )?;
        if found.is_none() {
            debug!(subject = %subject.object_id(), "no matching certificate");
        }
        Ok(found)
    }

    /// Finds stored certificates whose subject is `subject`.
    ///
    /// Matches are appended to `out` and their number is
    /// returned. At most
    /// [`Config::max_proxy_batch`][keyward_ipc::Config::max_proxy_batch]
    /// certificates are returned by one call.
    pub fn find_certs_by_subject(
        &self,
        subject: &X509DnProxy,
        out: &mut Vec<CertificateProxy>,
    ) -> Result<usize> {
        self.base().create_many(
            X509Task::FindCertsBySubject,
            &mut [Arg::object(subject)],
            out,
        )
    }

    /// Stores `cert`, optionally under `slot`.
    pub fn import(&self, cert: &CertificateProxy, slot: Option<&str>) -> Result<()> {
        let slot = slot.map(str::to_owned);
        self.base()
            .call_fallible(X509Task::Import, &mut [Arg::object(cert), Arg::value(&slot)])
    }

    /// Removes `cert` from storage.
    pub fn remove(&self, cert: &CertificateProxy) -> Result<bool> {
        self.base()
            .call_fallible(X509Task::Remove, &mut [Arg::object(cert)])
    }
}
