// Copyright (c) 2023 The MobileCoin Foundation

/// Error type for decoding certificates and verifying their signatures.
#[derive(Clone, Debug, displaydoc::Display, PartialEq, Eq)]
pub enum Error {
    /// An error occurred decoding the signature from a certificate
    SignatureDecoding,
    /// The certification signature does not match with the verifying key
    SignatureVerification,
    /// The signature or key algorithm is not supported
    UnsupportedAlgorithm,
    /// An error occurred decoding the certificate: {0}
    CertificateDecoding(x509_cert::der::Error),
    /// An error occurred decoding the key from a certificate
    KeyDecoding,
}

impl From<x509_cert::der::Error> for Error {
    fn from(src: x509_cert::der::Error) -> Self {
        Error::CertificateDecoding(src)
    }
}
