use keyward_ipc::{Arg, Proxy, Result, proxy, tasks};

tasks! {
    /// Tasks served by a distinguished name.
    pub enum X509DnTask: 0x000f {
        GetDnString = 1,
        SetDn = 2,
        GetAttribute = 3,
        SetAttribute = 4,
        Encode = 5,
    }
}

/// A distinguished name attribute.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum AttributeId {
    /// Common name (CN).
    CommonName = 0,
    /// Country (C).
    Country = 1,
    /// State or province (ST).
    State = 2,
    /// Locality (L).
    Locality = 3,
    /// Organization (O).
    Organization = 4,
    /// Organizational unit (OU).
    OrgUnit = 5,
    /// Street address.
    Street = 6,
    /// Postal code.
    PostalCode = 7,
    /// Title.
    Title = 8,
    /// Surname (SN).
    Surname = 9,
    /// Given name.
    GivenName = 10,
    /// Initials.
    Initials = 11,
    /// Pseudonym.
    Pseudonym = 12,
    /// Generation qualifier.
    GenerationQualifier = 13,
    /// Domain component (DC).
    DomainComponent = 14,
    /// DN qualifier.
    DnQualifier = 15,
    /// Email address.
    Email = 16,
    /// URI.
    Uri = 17,
    /// DNS name.
    Dns = 18,
    /// Host name.
    HostName = 19,
    /// IP address.
    IpAddress = 20,
    /// Serial numbers.
    SerialNumbers = 21,
    /// User id (UID).
    UserId = 22,
}

proxy! {
    /// An X.509 distinguished name.
    pub struct X509DnProxy;
}

impl X509DnProxy {
    /// Returns the name in its string form.
    pub fn dn_string(&self) -> Result<String> {
        self.base().call_fallible(X509DnTask::GetDnString, &mut [])
    }

    /// Replaces the whole name with the parsed string form
    /// `dn`.
    pub fn set_dn(&self, dn: &str) -> Result<()> {
        self.base()
            .call_fallible(X509DnTask::SetDn, &mut [Arg::value(dn)])
    }

    /// Returns the value of attribute `id`.
    pub fn attribute(&self, id: AttributeId) -> Result<String> {
        self.base()
            .call_fallible(X509DnTask::GetAttribute, &mut [Arg::value(&(id as u8))])
    }

    /// Sets attribute `id` to `value`.
    pub fn set_attribute(&self, id: AttributeId, value: &str) -> Result<()> {
        self.base().call_fallible(
            X509DnTask::SetAttribute,
            &mut [Arg::value(&(id as u8)), Arg::value(value)],
        )
    }

    /// Returns the DER encoding of the name.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.base().call_fallible(X509DnTask::Encode, &mut [])
    }
}
