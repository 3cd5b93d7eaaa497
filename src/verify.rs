//! Self-signature verification of a decoded request.
//!
//! Only checks that the request was signed by the key it carries. Nothing here says anything
//! about whether the subject is who it claims to be.

use crate::types::{AlgorithmParameters, DecodedCsr, PublicKeyInfo};
use der_parser::oid::Oid;
use log::debug;
use rsa::{BigUint, RsaPublicKey};
use sha2::Digest;
use signature::hazmat::PrehashVerifier;
use signature::Verifier;
use x509_parser::prelude::FromDer;
use x509_parser::public_key::RSAPublicKey;
use SignatureVerificationOutcome::{InvalidSignature, MalformedSignature, UnknownAlgorithm, Valid};

/// Largest RSA modulus accepted, in bits.
pub const MAX_RSA_BITS: usize = 16384;

/// Classification of one verification attempt. Exactly one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureVerificationOutcome {
    Valid,
    InvalidSignature,
    MalformedSignature,
    UnknownAlgorithm,
}

impl SignatureVerificationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, SignatureVerificationOutcome::Valid)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SignatureVerificationOutcome::Valid => "VALID",
            SignatureVerificationOutcome::InvalidSignature => "INVALID_SIGNATURE",
            SignatureVerificationOutcome::MalformedSignature => "MALFORMED_SIGNATURE",
            SignatureVerificationOutcome::UnknownAlgorithm => "UNKNOWN_ALGORITHM",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SignatureVerificationOutcome::Valid => {
                "The request is signed by the key it contains"
            }
            SignatureVerificationOutcome::InvalidSignature => {
                "The signature does not match the request content and public key"
            }
            SignatureVerificationOutcome::MalformedSignature => {
                "The signature or public key is malformed"
            }
            SignatureVerificationOutcome::UnknownAlgorithm => {
                "The signature algorithm or key type is not supported"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Md5 => md5::Md5::digest(data).to_vec(),
            DigestAlgorithm::Sha1 => sha1::Sha1::digest(data).to_vec(),
            DigestAlgorithm::Sha224 => sha2::Sha224::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => sha2::Sha256::digest(data).to_vec(),
            DigestAlgorithm::Sha384 => sha2::Sha384::digest(data).to_vec(),
            DigestAlgorithm::Sha512 => sha2::Sha512::digest(data).to_vec(),
        }
    }
}

/// Signature algorithms this crate can verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    Md5WithRsa,
    Sha1WithRsa,
    Sha224WithRsa,
    Sha256WithRsa,
    Sha384WithRsa,
    Sha512WithRsa,
    EcdsaWithSha224,
    EcdsaWithSha256,
    EcdsaWithSha384,
    EcdsaWithSha512,
    Ed25519,
}

impl SignatureAlgorithm {
    pub fn from_oid(oid: &Oid<'_>) -> Option<Self> {
        let algorithm = match oid.to_id_string().as_str() {
            "1.2.840.113549.1.1.4" => SignatureAlgorithm::Md5WithRsa,
            "1.2.840.113549.1.1.5" => SignatureAlgorithm::Sha1WithRsa,
            "1.2.840.113549.1.1.14" => SignatureAlgorithm::Sha224WithRsa,
            "1.2.840.113549.1.1.11" => SignatureAlgorithm::Sha256WithRsa,
            "1.2.840.113549.1.1.12" => SignatureAlgorithm::Sha384WithRsa,
            "1.2.840.113549.1.1.13" => SignatureAlgorithm::Sha512WithRsa,
            "1.2.840.10045.4.3.1" => SignatureAlgorithm::EcdsaWithSha224,
            "1.2.840.10045.4.3.2" => SignatureAlgorithm::EcdsaWithSha256,
            "1.2.840.10045.4.3.3" => SignatureAlgorithm::EcdsaWithSha384,
            "1.2.840.10045.4.3.4" => SignatureAlgorithm::EcdsaWithSha512,
            "1.3.101.112" => SignatureAlgorithm::Ed25519,
            _ => return None,
        };
        Some(algorithm)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SignatureAlgorithm::Md5WithRsa => "MD5WITHRSA",
            SignatureAlgorithm::Sha1WithRsa => "SHA1WITHRSA",
            SignatureAlgorithm::Sha224WithRsa => "SHA224WITHRSA",
            SignatureAlgorithm::Sha256WithRsa => "SHA256WITHRSA",
            SignatureAlgorithm::Sha384WithRsa => "SHA384WITHRSA",
            SignatureAlgorithm::Sha512WithRsa => "SHA512WITHRSA",
            SignatureAlgorithm::EcdsaWithSha224 => "SHA224WITHECDSA",
            SignatureAlgorithm::EcdsaWithSha256 => "SHA256WITHECDSA",
            SignatureAlgorithm::EcdsaWithSha384 => "SHA384WITHECDSA",
            SignatureAlgorithm::EcdsaWithSha512 => "SHA512WITHECDSA",
            SignatureAlgorithm::Ed25519 => "ED25519",
        }
    }

    /// Digest applied to the signed data. Ed25519 signs the message itself.
    pub fn digest(&self) -> Option<DigestAlgorithm> {
        match self {
            SignatureAlgorithm::Md5WithRsa => Some(DigestAlgorithm::Md5),
            SignatureAlgorithm::Sha1WithRsa => Some(DigestAlgorithm::Sha1),
            SignatureAlgorithm::Sha224WithRsa | SignatureAlgorithm::EcdsaWithSha224 => {
                Some(DigestAlgorithm::Sha224)
            }
            SignatureAlgorithm::Sha256WithRsa | SignatureAlgorithm::EcdsaWithSha256 => {
                Some(DigestAlgorithm::Sha256)
            }
            SignatureAlgorithm::Sha384WithRsa | SignatureAlgorithm::EcdsaWithSha384 => {
                Some(DigestAlgorithm::Sha384)
            }
            SignatureAlgorithm::Sha512WithRsa | SignatureAlgorithm::EcdsaWithSha512 => {
                Some(DigestAlgorithm::Sha512)
            }
            SignatureAlgorithm::Ed25519 => None,
        }
    }
}

/// Display name for a signature algorithm identifier, falling back to the dotted OID.
pub fn algorithm_name(oid: &Oid<'_>) -> String {
    if let Some(algorithm) = SignatureAlgorithm::from_oid(oid) {
        return algorithm.name().to_string();
    }

    let id = oid.to_id_string();
    let name = match id.as_str() {
        "1.2.840.113549.1.1.10" => "RSASSA-PSS",
        "1.2.840.113549.1.1.2" => "MD2WITHRSA",
        "1.2.840.10040.4.3" => "SHA1WITHDSA",
        "2.16.840.1.101.3.4.3.2" => "SHA256WITHDSA",
        "1.2.840.10045.4.1" => "SHA1WITHECDSA",
        "1.3.101.113" => "ED448",
        _ => return id,
    };
    name.to_string()
}

/// Display name for a public key algorithm, with the curve for EC keys.
pub fn key_algorithm_name(spki: &PublicKeyInfo) -> String {
    match spki.algorithm.oid.to_id_string().as_str() {
        "1.2.840.113549.1.1.1" => "RSA".to_string(),
        "1.2.840.10045.2.1" => match &spki.algorithm.parameters {
            AlgorithmParameters::Oid(curve) => match curve.to_id_string().as_str() {
                "1.2.840.10045.3.1.7" => "EC (P-256)".to_string(),
                "1.3.132.0.34" => "EC (P-384)".to_string(),
                "1.3.132.0.35" => "EC (P-521)".to_string(),
                other => format!("EC ({})", other),
            },
            _ => "EC".to_string(),
        },
        "1.2.840.10040.4.1" => "DSA".to_string(),
        "1.3.101.112" => "Ed25519".to_string(),
        "1.3.101.113" => "Ed448".to_string(),
        other => other.to_string(),
    }
}

/// Public key size in bits, when it can be determined.
pub fn key_size_bits(spki: &PublicKeyInfo) -> Option<usize> {
    match resolve_key(spki) {
        Ok(VerificationKey::Rsa(key)) => {
            use rsa::traits::PublicKeyParts;
            Some(key.n().bits())
        }
        Ok(VerificationKey::P256(_)) => Some(256),
        Ok(VerificationKey::P384(_)) => Some(384),
        Ok(VerificationKey::Ed25519(_)) => Some(256),
        Err(_) => None,
    }
}

enum VerificationKey {
    Rsa(RsaPublicKey),
    P256(p256::ecdsa::VerifyingKey),
    P384(p384::ecdsa::VerifyingKey),
    Ed25519(ed25519_dalek::VerifyingKey),
}

fn resolve_key(spki: &PublicKeyInfo) -> Result<VerificationKey, SignatureVerificationOutcome> {
    if spki.unused_bits != 0 {
        return Err(MalformedSignature);
    }

    match spki.algorithm.oid.to_id_string().as_str() {
        "1.2.840.113549.1.1.1" => {
            let (_, key) = RSAPublicKey::from_der(&spki.key).map_err(|_| MalformedSignature)?;
            let n = BigUint::from_bytes_be(key.modulus);
            let e = BigUint::from_bytes_be(key.exponent);
            RsaPublicKey::new_with_max_size(n, e, MAX_RSA_BITS)
                .map(VerificationKey::Rsa)
                .map_err(|_| MalformedSignature)
        }
        "1.2.840.10045.2.1" => {
            let curve = match &spki.algorithm.parameters {
                AlgorithmParameters::Oid(curve) => curve.to_id_string(),
                _ => return Err(UnknownAlgorithm),
            };
            match curve.as_str() {
                "1.2.840.10045.3.1.7" => p256::ecdsa::VerifyingKey::from_sec1_bytes(&spki.key)
                    .map(VerificationKey::P256)
                    .map_err(|_| MalformedSignature),
                "1.3.132.0.34" => p384::ecdsa::VerifyingKey::from_sec1_bytes(&spki.key)
                    .map(VerificationKey::P384)
                    .map_err(|_| MalformedSignature),
                _ => Err(UnknownAlgorithm),
            }
        }
        "1.3.101.112" => {
            let bytes: [u8; 32] = spki
                .key
                .as_slice()
                .try_into()
                .map_err(|_| MalformedSignature)?;
            ed25519_dalek::VerifyingKey::from_bytes(&bytes)
                .map(VerificationKey::Ed25519)
                .map_err(|_| MalformedSignature)
        }
        _ => Err(UnknownAlgorithm),
    }
}

fn verify_rsa<D>(key: &RsaPublicKey, data: &[u8], sig: &[u8]) -> SignatureVerificationOutcome
where
    D: Digest + rsa::pkcs8::AssociatedOid,
{
    use rsa::traits::PublicKeyParts;

    if sig.len() != key.size() {
        return MalformedSignature;
    }
    let Ok(signature) = rsa::pkcs1v15::Signature::try_from(sig) else {
        return MalformedSignature;
    };

    let verifying_key = rsa::pkcs1v15::VerifyingKey::<D>::new(key.clone());
    match verifying_key.verify(data, &signature) {
        Ok(()) => Valid,
        Err(_) => InvalidSignature,
    }
}

fn verify_with(
    algorithm: SignatureAlgorithm,
    key: &VerificationKey,
    data: &[u8],
    sig: &[u8],
) -> SignatureVerificationOutcome {
    use SignatureAlgorithm::*;

    match (algorithm, key) {
        (Md5WithRsa, VerificationKey::Rsa(key)) => verify_rsa::<md5::Md5>(key, data, sig),
        (Sha1WithRsa, VerificationKey::Rsa(key)) => verify_rsa::<sha1::Sha1>(key, data, sig),
        (Sha224WithRsa, VerificationKey::Rsa(key)) => verify_rsa::<sha2::Sha224>(key, data, sig),
        (Sha256WithRsa, VerificationKey::Rsa(key)) => verify_rsa::<sha2::Sha256>(key, data, sig),
        (Sha384WithRsa, VerificationKey::Rsa(key)) => verify_rsa::<sha2::Sha384>(key, data, sig),
        (Sha512WithRsa, VerificationKey::Rsa(key)) => verify_rsa::<sha2::Sha512>(key, data, sig),
        (
            EcdsaWithSha224 | EcdsaWithSha256 | EcdsaWithSha384 | EcdsaWithSha512,
            VerificationKey::P256(key),
        ) => {
            let Ok(signature) = p256::ecdsa::Signature::from_der(sig) else {
                return MalformedSignature;
            };
            let Some(digest) = algorithm.digest() else {
                return UnknownAlgorithm;
            };
            match key.verify_prehash(&digest.digest(data), &signature) {
                Ok(()) => Valid,
                Err(_) => InvalidSignature,
            }
        }
        (
            EcdsaWithSha224 | EcdsaWithSha256 | EcdsaWithSha384 | EcdsaWithSha512,
            VerificationKey::P384(key),
        ) => {
            let Ok(signature) = p384::ecdsa::Signature::from_der(sig) else {
                return MalformedSignature;
            };
            let Some(digest) = algorithm.digest() else {
                return UnknownAlgorithm;
            };
            match key.verify_prehash(&digest.digest(data), &signature) {
                Ok(()) => Valid,
                Err(_) => InvalidSignature,
            }
        }
        (Ed25519, VerificationKey::Ed25519(key)) => {
            let Ok(signature) = ed25519_dalek::Signature::from_slice(sig) else {
                return MalformedSignature;
            };
            match key.verify(data, &signature) {
                Ok(()) => Valid,
                Err(_) => InvalidSignature,
            }
        }
        // Key type does not belong to the declared algorithm family.
        _ => UnknownAlgorithm,
    }
}

/// Verifies the request's signature over its `CertificationRequestInfo` with its own key.
pub fn verify_signature(csr: &DecodedCsr) -> SignatureVerificationOutcome {
    let sig_alg = csr.signature_algorithm();
    let Some(algorithm) = SignatureAlgorithm::from_oid(&sig_alg.oid) else {
        debug!("no verification routine for signature algorithm {}", sig_alg.oid);
        return UnknownAlgorithm;
    };

    let key = match resolve_key(csr.public_key()) {
        Ok(key) => key,
        Err(outcome) => {
            debug!(
                "public key {} not usable for {}: {}",
                csr.public_key().algorithm.oid,
                algorithm.name(),
                outcome.name()
            );
            return outcome;
        }
    };

    if csr.signature_unused_bits() != 0 {
        return MalformedSignature;
    }

    let outcome = verify_with(algorithm, &key, csr.signed_data(), csr.signature());
    debug!("{} verification: {}", algorithm.name(), outcome.name());
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::parse;
    use crate::types::DecodedCsr;

    static WIKIPEDIA_PEM: &[u8] = include_bytes!("../tests/data/wikipedia.csr");
    static SAN_DER: &[u8] = include_bytes!("../tests/data/rsa_sha256_san.der");
    static P256_PEM: &[u8] = include_bytes!("../tests/data/p256_plain.csr");
    static P384_PEM: &[u8] = include_bytes!("../tests/data/p384_keyusage.csr");
    static ED25519_PEM: &[u8] = include_bytes!("../tests/data/ed25519_two_dns.csr");
    static PSS_PEM: &[u8] = include_bytes!("../tests/data/rsa_pss.csr");

    fn decoded(bytes: &[u8]) -> DecodedCsr {
        parse(bytes).into_result().unwrap()
    }

    fn generated(alg: &'static rcgen::SignatureAlgorithm) -> Vec<u8> {
        let key_pair = rcgen::KeyPair::generate_for(alg).unwrap();
        let params =
            rcgen::CertificateParams::new(vec!["generated.example.com".to_string()]).unwrap();
        params.serialize_request(&key_pair).unwrap().der().to_vec()
    }

    /// Flips the lowest bit of the final byte, which is the end of the signature BIT STRING.
    fn flip_signature_bit(der: &[u8]) -> Vec<u8> {
        let mut tampered = der.to_vec();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;
        tampered
    }

    #[test]
    fn test_fixture_signatures_valid() {
        for fixture in [WIKIPEDIA_PEM, SAN_DER, P256_PEM, P384_PEM, ED25519_PEM] {
            assert_eq!(verify_signature(&decoded(fixture)), Valid);
        }
    }

    #[test]
    fn test_wikipedia_algorithm_is_md5_rsa() {
        let csr = decoded(WIKIPEDIA_PEM);
        assert_eq!(
            SignatureAlgorithm::from_oid(&csr.signature_algorithm().oid),
            Some(SignatureAlgorithm::Md5WithRsa)
        );
        assert_eq!(algorithm_name(&csr.signature_algorithm().oid), "MD5WITHRSA");
    }

    #[test]
    fn test_generated_requests_valid() {
        for alg in [
            &rcgen::PKCS_ECDSA_P256_SHA256,
            &rcgen::PKCS_ECDSA_P384_SHA384,
            &rcgen::PKCS_ED25519,
        ] {
            let der = generated(alg);
            assert_eq!(verify_signature(&decoded(&der)), Valid);
        }
    }

    #[test]
    fn test_flipped_bit_is_invalid() {
        for der in [
            SAN_DER.to_vec(),
            generated(&rcgen::PKCS_ED25519),
        ] {
            let tampered = flip_signature_bit(&der);
            assert_eq!(verify_signature(&decoded(&tampered)), InvalidSignature);
        }
    }

    #[test]
    fn test_tampered_subject_is_invalid() {
        let csr = decoded(SAN_DER);
        let der = SAN_DER.to_vec();
        // Change one character of "www.example.com" in the subject.
        let pos = der
            .windows(b"www.example.com".len())
            .position(|w| w == b"www.example.com")
            .unwrap();
        let mut tampered = der.clone();
        tampered[pos] = b'x';
        let tampered_csr = decoded(&tampered);
        assert_eq!(verify_signature(&csr), Valid);
        assert_eq!(verify_signature(&tampered_csr), InvalidSignature);
    }

    #[test]
    fn test_pss_is_unknown_algorithm() {
        let csr = decoded(PSS_PEM);
        assert_eq!(verify_signature(&csr), UnknownAlgorithm);
        assert_eq!(algorithm_name(&csr.signature_algorithm().oid), "RSASSA-PSS");
    }

    #[test]
    fn test_unknown_oid_name_falls_back_to_dotted() {
        let oid = Oid::from(&[1, 2, 3, 4]).unwrap();
        assert_eq!(algorithm_name(&oid), "1.2.3.4");
        assert!(SignatureAlgorithm::from_oid(&oid).is_none());
    }

    #[test]
    fn test_key_sizes() {
        assert_eq!(key_size_bits(decoded(WIKIPEDIA_PEM).public_key()), Some(1024));
        assert_eq!(key_size_bits(decoded(SAN_DER).public_key()), Some(2048));
        assert_eq!(key_size_bits(decoded(P384_PEM).public_key()), Some(384));
        assert_eq!(key_algorithm_name(decoded(P256_PEM).public_key()), "EC (P-256)");
        assert_eq!(key_algorithm_name(decoded(ED25519_PEM).public_key()), "Ed25519");
    }

    #[test]
    fn test_algorithm_key_mismatch() {
        let rsa = decoded(SAN_DER);
        let ed = decoded(ED25519_PEM);
        let key = resolve_key(ed.public_key()).ok().unwrap();
        assert_eq!(
            verify_with(
                SignatureAlgorithm::Sha256WithRsa,
                &key,
                rsa.signed_data(),
                rsa.signature()
            ),
            UnknownAlgorithm
        );
    }

    #[test]
    fn test_malformed_signature_shapes() {
        let ed = decoded(ED25519_PEM);
        let key = resolve_key(ed.public_key()).ok().unwrap();
        assert_eq!(
            verify_with(SignatureAlgorithm::Ed25519, &key, ed.signed_data(), &[0u8; 10]),
            MalformedSignature
        );

        let p256 = decoded(P256_PEM);
        let key = resolve_key(p256.public_key()).ok().unwrap();
        assert_eq!(
            verify_with(
                SignatureAlgorithm::EcdsaWithSha256,
                &key,
                p256.signed_data(),
                &[0x30, 0x00]
            ),
            MalformedSignature
        );

        let rsa = decoded(SAN_DER);
        let key = resolve_key(rsa.public_key()).ok().unwrap();
        assert_eq!(
            verify_with(
                SignatureAlgorithm::Sha256WithRsa,
                &key,
                rsa.signed_data(),
                &rsa.signature()[1..]
            ),
            MalformedSignature
        );
    }

    #[test]
    fn test_signature_unused_bits_is_malformed() {
        // 2048-bit RSA: the BIT STRING holds the unused-bits octet then 256 signature bytes.
        let mut der = SAN_DER.to_vec();
        let unused_bits = der.len() - 257;
        der[unused_bits] = 0x01;

        let csr = decoded(&der);
        assert_eq!(csr.signature_unused_bits(), 1);
        assert_eq!(
            verify_signature(&csr),
            SignatureVerificationOutcome::MalformedSignature
        );
    }

    #[test]
    fn test_malformed_key() {
        let mut spki = decoded(P256_PEM).public_key().clone();
        spki.key = vec![0x04, 0x01, 0x02];
        assert!(matches!(resolve_key(&spki), Err(MalformedSignature)));

        spki.unused_bits = 1;
        assert!(matches!(resolve_key(&spki), Err(MalformedSignature)));
    }

    #[test]
    fn test_outcome_names() {
        assert_eq!(Valid.name(), "VALID");
        assert!(Valid.is_valid());
        assert!(!InvalidSignature.is_valid());
        assert_eq!(UnknownAlgorithm.name(), "UNKNOWN_ALGORITHM");
    }
}
