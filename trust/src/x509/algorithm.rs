// Copyright (c) 2023 The MobileCoin Foundation

//! Algorithm data types used to link certificates in a certification path
//!
//! Only the algorithms needed to check issuer signatures are supported. An
//! algorithm that is not supported is reported as
//! [`Error::UnsupportedAlgorithm`] so that callers can tell it apart from a
//! signature that is known to be wrong.

use super::{Error, Result};
use const_oid::ObjectIdentifier;
use p256::ecdsa;
use p256::ecdsa::signature::Verifier;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::traits::PublicKeyParts;
use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256, Sha384, Sha512};
use x509_cert::der::Any;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

const OID_PKCS1_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const OID_PKCS1_MD5_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.4");
const OID_PKCS1_SHA1_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");
const OID_PKCS1_SHA256_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
const OID_PKCS1_SHA384_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
const OID_PKCS1_SHA512_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");
pub(crate) const OID_EC_PUBLIC_KEY: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const OID_CURVE_P256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const OID_SIG_ECDSA_WITH_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.1");
const OID_SIG_ECDSA_WITH_SHA256: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");

/// Returns `true` for signature algorithms built on a broken hash function.
pub(crate) fn is_weak_signature_algorithm(algorithm: &AlgorithmIdentifierOwned) -> bool {
    matches!(
        algorithm.oid,
        OID_PKCS1_MD5_WITH_RSA | OID_PKCS1_SHA1_WITH_RSA | OID_SIG_ECDSA_WITH_SHA1
    )
}

/// Public key used in PKI signature verification
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum PublicKey {
    /// Elliptic curve public key
    Ecdsa(ecdsa::VerifyingKey),
    /// RSA public key
    Rsa(rsa::RsaPublicKey),
}

impl PublicKey {
    /// Decode the key from `info`.
    ///
    /// Elliptic curve keys are allowed to omit their domain parameters, in
    /// which case `inherited` (the parameters of the closest issuer that has
    /// them) is used.
    ///
    /// # Errors
    /// - `Error::UnsupportedAlgorithm` for key types or curves that are not
    ///   supported, or an elliptic curve key without any parameters.
    /// - `Error::KeyDecoding` if the key bytes are malformed.
    pub fn from_subject_public_key_info(
        info: &SubjectPublicKeyInfoOwned,
        inherited: Option<&Any>,
    ) -> Result<Self> {
        let bytes = info
            .subject_public_key
            .as_bytes()
            .ok_or(Error::KeyDecoding)?;
        match info.algorithm.oid {
            OID_EC_PUBLIC_KEY => {
                let parameters = info
                    .algorithm
                    .parameters
                    .as_ref()
                    .or(inherited)
                    .ok_or(Error::UnsupportedAlgorithm)?;
                let curve = parameters
                    .decode_as::<ObjectIdentifier>()
                    .map_err(|_| Error::KeyDecoding)?;
                if curve != OID_CURVE_P256 {
                    return Err(Error::UnsupportedAlgorithm);
                }
                let key =
                    ecdsa::VerifyingKey::from_sec1_bytes(bytes).map_err(|_| Error::KeyDecoding)?;
                Ok(PublicKey::Ecdsa(key))
            }
            OID_PKCS1_RSA_ENCRYPTION => {
                let key =
                    rsa::RsaPublicKey::from_pkcs1_der(bytes).map_err(|_| Error::KeyDecoding)?;
                Ok(PublicKey::Rsa(key))
            }
            _ => Err(Error::UnsupportedAlgorithm),
        }
    }

    /// The size of the key in bits
    pub fn bits(&self) -> usize {
        match self {
            PublicKey::Ecdsa(_) => 256,
            PublicKey::Rsa(key) => key.size() * 8,
        }
    }

    /// Verify the `message` and `signature` match this [`PublicKey`]
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        match (self, signature) {
            (PublicKey::Ecdsa(key), Signature::Ecdsa(sig)) => key
                .verify(message, sig)
                .map_err(|_| Error::SignatureVerification),
            (PublicKey::Rsa(key), Signature::Rsa { digest, bytes }) => {
                let (scheme, hashed) = digest.scheme_and_hash(message);
                key.verify(scheme, &hashed, bytes)
                    .map_err(|_| Error::SignatureVerification)
            }
            _ => Err(Error::SignatureVerification),
        }
    }
}

/// Create a [`PublicKey`] from a [`SubjectPublicKeyInfoOwned`] which carries
/// all of its own parameters.
impl TryFrom<&SubjectPublicKeyInfoOwned> for PublicKey {
    type Error = Error;

    fn try_from(value: &SubjectPublicKeyInfoOwned) -> core::result::Result<Self, Self::Error> {
        Self::from_subject_public_key_info(value, None)
    }
}

/// The digest an RSA PKCS#1 v1.5 signature was computed over
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RsaDigest {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl RsaDigest {
    fn scheme_and_hash(self, message: &[u8]) -> (Pkcs1v15Sign, Vec<u8>) {
        match self {
            RsaDigest::Sha256 => (
                Pkcs1v15Sign::new::<Sha256>(),
                Sha256::digest(message).to_vec(),
            ),
            RsaDigest::Sha384 => (
                Pkcs1v15Sign::new::<Sha384>(),
                Sha384::digest(message).to_vec(),
            ),
            RsaDigest::Sha512 => (
                Pkcs1v15Sign::new::<Sha512>(),
                Sha512::digest(message).to_vec(),
            ),
        }
    }
}

/// Signature used in PKI verification
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Signature {
    /// Elliptic curve signature
    Ecdsa(ecdsa::Signature),
    /// RSA signature
    Rsa {
        /// Digest the signature was made over
        digest: RsaDigest,
        /// Raw signature bytes
        bytes: Vec<u8>,
    },
}

impl Signature {
    /// Create a [`Signature`] from the `algorithm` and `signature` bytes
    pub fn try_from_algorithm_and_signature(
        algorithm: &AlgorithmIdentifierOwned,
        signature: &[u8],
    ) -> Result<Self> {
        let rsa = |digest| {
            Ok(Signature::Rsa {
                digest,
                bytes: signature.to_vec(),
            })
        };
        match algorithm.oid {
            OID_SIG_ECDSA_WITH_SHA256 => {
                let sig =
                    ecdsa::Signature::from_der(signature).map_err(|_| Error::SignatureDecoding)?;
                Ok(Signature::Ecdsa(sig))
            }
            OID_PKCS1_SHA256_WITH_RSA => rsa(RsaDigest::Sha256),
            OID_PKCS1_SHA384_WITH_RSA => rsa(RsaDigest::Sha384),
            OID_PKCS1_SHA512_WITH_RSA => rsa(RsaDigest::Sha512),
            _ => Err(Error::UnsupportedAlgorithm),
        }
    }
}
