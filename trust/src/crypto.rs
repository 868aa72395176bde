// Copyright (c) 2023 The MobileCoin Foundation

//! Signature verification used to link certificates in a path

use crate::x509::{self, Certificate, PublicKey};
use core::fmt::Debug;
use tracing::trace;
use x509_cert::der::Any;

/// Checks the cryptographic link between a certificate and its issuer.
pub trait SignatureVerifier: Debug + Send + Sync {
    /// Extract the public key of `certificate`.
    ///
    /// `inherited` are the elliptic curve domain parameters of the closest
    /// issuer, for keys which omit their own. `None` when the key can not be
    /// used by this verifier.
    fn extract_public_key(
        &self,
        certificate: &Certificate,
        inherited: Option<&Any>,
    ) -> Option<PublicKey>;

    /// Verify the signature of `subject` with the `issuer_key`.
    ///
    /// # Errors
    /// - `x509::Error::UnsupportedAlgorithm` when the signature algorithm is
    ///   not supported, the link is neither proven nor disproven.
    /// - Any other error means the signature does not verify.
    fn verify_signature(&self, subject: &Certificate, issuer_key: &PublicKey) -> x509::Result<()>;
}

/// Verifies ECDSA P-256 and RSA PKCS#1 v1.5 signatures.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DefaultSignatureVerifier;

impl SignatureVerifier for DefaultSignatureVerifier {
    fn extract_public_key(
        &self,
        certificate: &Certificate,
        inherited: Option<&Any>,
    ) -> Option<PublicKey> {
        match certificate.public_key(inherited) {
            Ok(key) => Some(key),
            Err(error) => {
                trace!(%error, subject = %certificate.subject(), "unusable public key");
                None
            }
        }
    }

    fn verify_signature(&self, subject: &Certificate, issuer_key: &PublicKey) -> x509::Result<()> {
        let signature = subject.signature()?;
        issuer_key.verify(subject.tbs_der(), &signature)
    }
}
