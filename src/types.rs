use crate::error::DecodeError;
use der_parser::asn1_rs::Tag;
use der_parser::oid::Oid;
use x509_parser::prelude::*;

/// Envelope the request was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Pem,
    Der,
}

impl SourceEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            SourceEncoding::Pem => "PEM",
            SourceEncoding::Der => "DER",
        }
    }
}

/// One attribute type and value of a relative distinguished name.
///
/// `value` holds the content octets of the value, `tag` its universal ASN.1 tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameAttribute {
    pub oid: Oid<'static>,
    pub tag: Tag,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelativeName {
    pub attributes: Vec<NameAttribute>,
}

/// An X.500 name, RDNs kept in encoded order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectName {
    pub rdns: Vec<RelativeName>,
}

impl SubjectName {
    pub(crate) fn from_x509(name: &X509Name<'_>) -> Self {
        let rdns = name
            .iter()
            .map(|rdn| RelativeName {
                attributes: rdn
                    .iter()
                    .map(|attr| NameAttribute {
                        oid: attr.attr_type().to_owned(),
                        tag: attr.attr_value().tag(),
                        value: attr.attr_value().data.to_vec(),
                    })
                    .collect(),
            })
            .collect();

        SubjectName { rdns }
    }

    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmParameters {
    Absent,
    Null,
    Oid(Oid<'static>),
    Other { tag: Tag, value: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmId {
    pub oid: Oid<'static>,
    pub parameters: AlgorithmParameters,
}

impl AlgorithmId {
    pub(crate) fn from_x509(alg: &AlgorithmIdentifier<'_>) -> Self {
        let parameters = match &alg.parameters {
            None => AlgorithmParameters::Absent,
            Some(any) if any.tag() == Tag::Null => AlgorithmParameters::Null,
            Some(any) => match any.as_oid() {
                Ok(oid) => AlgorithmParameters::Oid(oid.to_owned()),
                Err(_) => AlgorithmParameters::Other {
                    tag: any.tag(),
                    value: any.data.to_vec(),
                },
            },
        };

        AlgorithmId {
            oid: alg.algorithm.to_owned(),
            parameters,
        }
    }
}

/// Subject public key info: algorithm, key bit string, and the full DER encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyInfo {
    pub algorithm: AlgorithmId,
    pub key: Vec<u8>,
    pub unused_bits: u8,
    pub der: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedExtension {
    pub oid: Oid<'static>,
    pub critical: bool,
    pub value: Vec<u8>,
}

/// A structurally valid PKCS#10 request.
///
/// Everything is copied out of the input buffer, so a `DecodedCsr` owns its data and can be
/// moved across threads. It is only built by the decoder and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCsr {
    encoding: SourceEncoding,
    version: u32,
    subject: SubjectName,
    public_key: PublicKeyInfo,
    signature_algorithm: AlgorithmId,
    signature: Vec<u8>,
    signature_unused_bits: u8,
    signed_data: Vec<u8>,
    requested_extensions: Option<Vec<RequestedExtension>>,
    der: Vec<u8>,
}

impl DecodedCsr {
    pub(crate) fn from_x509(
        req: &X509CertificationRequest<'_>,
        der: &[u8],
        encoding: SourceEncoding,
    ) -> Self {
        let info = &req.certification_request_info;
        let spki = &info.subject_pki;

        let requested_extensions = info.iter_attributes().find_map(|attr| {
            match attr.parsed_attribute() {
                ParsedCriAttribute::ExtensionRequest(request) => Some(
                    request
                        .extensions
                        .iter()
                        .map(|ext| RequestedExtension {
                            oid: ext.oid.to_owned(),
                            critical: ext.critical,
                            value: ext.value.to_vec(),
                        })
                        .collect(),
                ),
                _ => None,
            }
        });

        DecodedCsr {
            encoding,
            version: info.version.0,
            subject: SubjectName::from_x509(&info.subject),
            public_key: PublicKeyInfo {
                algorithm: AlgorithmId::from_x509(&spki.algorithm),
                key: spki.subject_public_key.data.to_vec(),
                unused_bits: spki.subject_public_key.unused_bits,
                der: spki.raw.to_vec(),
            },
            signature_algorithm: AlgorithmId::from_x509(&req.signature_algorithm),
            signature: req.signature_value.data.to_vec(),
            signature_unused_bits: req.signature_value.unused_bits,
            signed_data: info.raw.to_vec(),
            requested_extensions,
            der: der.to_vec(),
        }
    }

    pub fn encoding(&self) -> SourceEncoding {
        self.encoding
    }

    /// PKCS#10 version field; `0` means v1, the only defined value.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn subject(&self) -> &SubjectName {
        &self.subject
    }

    pub fn public_key(&self) -> &PublicKeyInfo {
        &self.public_key
    }

    pub fn signature_algorithm(&self) -> &AlgorithmId {
        &self.signature_algorithm
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn signature_unused_bits(&self) -> u8 {
        self.signature_unused_bits
    }

    /// DER of `CertificationRequestInfo`, the bytes covered by the signature.
    pub fn signed_data(&self) -> &[u8] {
        &self.signed_data
    }

    /// `None` when the request has no extensionRequest attribute.
    pub fn requested_extensions(&self) -> Option<&[RequestedExtension]> {
        self.requested_extensions.as_deref()
    }

    pub fn find_extension(&self, oid: &Oid<'_>) -> Option<&RequestedExtension> {
        self.requested_extensions()?
            .iter()
            .find(|ext| ext.oid == *oid)
    }

    /// The DER encoding of the whole request.
    pub fn der(&self) -> &[u8] {
        &self.der
    }
}

/// Result of decoding a buffer. A decoded request is always present on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Success(DecodedCsr),
    DecodeError(DecodeError),
}

impl ParseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ParseOutcome::Success(_))
    }

    pub fn csr(&self) -> Option<&DecodedCsr> {
        match self {
            ParseOutcome::Success(csr) => Some(csr),
            ParseOutcome::DecodeError(_) => None,
        }
    }

    pub fn error(&self) -> Option<&DecodeError> {
        match self {
            ParseOutcome::Success(_) => None,
            ParseOutcome::DecodeError(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<DecodedCsr, DecodeError> {
        match self {
            ParseOutcome::Success(csr) => Ok(csr),
            ParseOutcome::DecodeError(err) => Err(err),
        }
    }
}

impl From<Result<DecodedCsr, DecodeError>> for ParseOutcome {
    fn from(result: Result<DecodedCsr, DecodeError>) -> Self {
        match result {
            Ok(csr) => ParseOutcome::Success(csr),
            Err(err) => ParseOutcome::DecodeError(err),
        }
    }
}
