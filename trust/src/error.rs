// Copyright (c) 2023 The MobileCoin Foundation

//! Errors that can occur setting up a trust evaluation

use crate::x509;

/// Result of setting up a trust evaluation
pub type Result<T> = core::result::Result<T, Error>;

/// Error with the inputs of a trust evaluation
#[derive(displaydoc::Display, Debug)]
pub enum Error {
    /// At least one certificate is required to evaluate trust
    EmptyCertificates,
    /// At least one policy is required to evaluate trust
    EmptyPolicies,
    /// Error decoding a certificate: {0}
    CertificateDecoding(der::Error),
    /// Error working with a certificate: {0}
    Certificate(x509::Error),
    /// The exceptions are not a list of exception entries
    MalformedExceptions,
    /// Error parsing JSON: {0}
    Serde(serde_json::Error),
}

impl From<der::Error> for Error {
    fn from(e: der::Error) -> Self {
        Error::CertificateDecoding(e)
    }
}

impl From<x509::Error> for Error {
    fn from(e: x509::Error) -> Self {
        match e {
            x509::Error::CertificateDecoding(e) => Error::CertificateDecoding(e),
            e => Error::Certificate(e),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serde(e)
    }
}
