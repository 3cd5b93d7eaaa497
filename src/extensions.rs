use crate::names::name_to_string;
use crate::types::{DecodedCsr, RequestedExtension, SubjectName};
use der_parser::oid::Oid;
use log::warn;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use x509_parser::extensions::{GeneralName as X509GeneralName, SubjectAlternativeName};
use x509_parser::oid_registry::OID_X509_EXT_SUBJECT_ALT_NAME;
use x509_parser::prelude::FromDer;

/// An owned entry of a Subject Alternative Name extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneralName {
    Dns(String),
    Email(String),
    Uri(String),
    Ip(IpAddr),
    DirectoryName(String),
    RegisteredId(Oid<'static>),
    OtherName { type_id: Oid<'static>, value: Vec<u8> },
    X400Address(Vec<u8>),
    EdiPartyName(Vec<u8>),
}

impl GeneralName {
    pub fn kind(&self) -> &'static str {
        match self {
            GeneralName::Dns(_) => "DNS",
            GeneralName::Email(_) => "Email",
            GeneralName::Uri(_) => "URI",
            GeneralName::Ip(_) => "IP",
            GeneralName::DirectoryName(_) => "DirName",
            GeneralName::RegisteredId(_) => "RID",
            GeneralName::OtherName { .. } => "othername",
            GeneralName::X400Address(_) => "X400",
            GeneralName::EdiPartyName(_) => "EDIPartyName",
        }
    }

    pub fn value(&self) -> String {
        match self {
            GeneralName::Dns(s) | GeneralName::Email(s) | GeneralName::Uri(s) => s.clone(),
            GeneralName::DirectoryName(s) => s.clone(),
            GeneralName::Ip(ip) => ip.to_string(),
            GeneralName::RegisteredId(oid) => oid.to_id_string(),
            GeneralName::OtherName { type_id, value } => {
                format!("{};#{}", type_id.to_id_string(), hex::encode(value))
            }
            GeneralName::X400Address(raw) | GeneralName::EdiPartyName(raw) => {
                format!("#{}", hex::encode(raw))
            }
        }
    }

    fn from_x509(name: &X509GeneralName<'_>) -> Result<Self, String> {
        let converted = match name {
            X509GeneralName::DNSName(s) => GeneralName::Dns(s.to_string()),
            X509GeneralName::RFC822Name(s) => GeneralName::Email(s.to_string()),
            X509GeneralName::URI(s) => GeneralName::Uri(s.to_string()),
            X509GeneralName::IPAddress(bytes) => GeneralName::Ip(parse_ip(bytes)?),
            X509GeneralName::DirectoryName(dn) => {
                GeneralName::DirectoryName(name_to_string(&SubjectName::from_x509(dn)))
            }
            X509GeneralName::RegisteredID(oid) => GeneralName::RegisteredId(oid.to_owned()),
            X509GeneralName::OtherName(oid, value) => GeneralName::OtherName {
                type_id: oid.to_owned(),
                value: value.to_vec(),
            },
            X509GeneralName::X400Address(any) => GeneralName::X400Address(any.data.to_vec()),
            X509GeneralName::EDIPartyName(any) => GeneralName::EdiPartyName(any.data.to_vec()),
        };
        Ok(converted)
    }
}

impl fmt::Display for GeneralName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.value())
    }
}

fn parse_ip(bytes: &[u8]) -> Result<IpAddr, String> {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        return Ok(IpAddr::V4(Ipv4Addr::from(octets)));
    }
    if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
        return Ok(IpAddr::V6(Ipv6Addr::from(octets)));
    }
    Err(format!("IP address entry of {} bytes", bytes.len()))
}

/// Subject alternative names as requested by a CSR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AltNames {
    /// No SAN extension was requested.
    NotRequested,
    Present(Vec<GeneralName>),
    /// A SAN extension was requested but could not be decoded.
    Unavailable(String),
}

impl AltNames {
    /// The decoded names; empty unless `Present`.
    pub fn names(&self) -> &[GeneralName] {
        match self {
            AltNames::Present(names) => names,
            AltNames::NotRequested | AltNames::Unavailable(_) => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names().is_empty()
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, AltNames::Unavailable(_))
    }
}

/// Decodes the value of a subjectAltName extension.
pub fn decode_alt_names(value: &[u8]) -> Result<Vec<GeneralName>, String> {
    let (rem, san) = SubjectAlternativeName::from_der(value).map_err(|e| e.to_string())?;
    if !rem.is_empty() {
        return Err(format!("{} trailing byte(s) after subjectAltName", rem.len()));
    }

    san.general_names.iter().map(GeneralName::from_x509).collect()
}

/// Finds and decodes the requested SAN extension.
///
/// A request without an extensionRequest attribute, or whose attribute holds no SAN, yields
/// `NotRequested`. A SAN that fails to decode yields `Unavailable` and never fails the caller.
pub fn extract_alt_names(csr: &DecodedCsr) -> AltNames {
    let Some(ext) = csr.find_extension(&OID_X509_EXT_SUBJECT_ALT_NAME) else {
        return AltNames::NotRequested;
    };

    match decode_alt_names(&ext.value) {
        Ok(names) => AltNames::Present(names),
        Err(reason) => {
            warn!("requested subjectAltName could not be decoded: {}", reason);
            AltNames::Unavailable(reason)
        }
    }
}

/// Short name for well-known extension types.
pub fn extension_name(oid: &Oid<'_>) -> Option<&'static str> {
    let name = match oid.to_id_string().as_str() {
        "2.5.29.17" => "subjectAltName",
        "2.5.29.15" => "keyUsage",
        "2.5.29.37" => "extendedKeyUsage",
        "2.5.29.19" => "basicConstraints",
        "2.5.29.14" => "subjectKeyIdentifier",
        "2.5.29.32" => "certificatePolicies",
        "2.5.29.30" => "nameConstraints",
        "1.3.6.1.5.5.7.1.1" => "authorityInfoAccess",
        "1.3.6.1.5.5.7.1.24" => "tlsFeature",
        _ => return None,
    };
    Some(name)
}

/// Summary of one requested extension, for display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSummary {
    pub oid: String,
    pub name: Option<&'static str>,
    pub critical: bool,
}

impl From<&RequestedExtension> for ExtensionSummary {
    fn from(ext: &RequestedExtension) -> Self {
        ExtensionSummary {
            oid: ext.oid.to_id_string(),
            name: extension_name(&ext.oid),
            critical: ext.critical,
        }
    }
}

/// Every requested extension in encoded order. Empty when none were requested.
pub fn requested_extensions(csr: &DecodedCsr) -> Vec<ExtensionSummary> {
    csr.requested_extensions()
        .unwrap_or_default()
        .iter()
        .map(ExtensionSummary::from)
        .collect()
}
