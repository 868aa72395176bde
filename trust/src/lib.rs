// Copyright (c) 2023 The MobileCoin Foundation

#![doc = include_str!("../README.md")]
#![deny(missing_docs, missing_debug_implementations, unsafe_code)]

pub mod builder;
mod context;
pub mod crypto;
mod environment;
mod error;
pub mod exceptions;
mod options;
pub mod path;
pub mod policy;
pub mod properties;
mod result;
pub mod score;
pub mod source;
pub mod store;
pub mod x509;

#[cfg(test)]
mod test_support;

pub use crate::{
    builder::{BuildReport, BuildRequest, PathBuilder},
    context::TrustEvaluation,
    crypto::{DefaultSignatureVerifier, SignatureVerifier},
    environment::{TrustEnvironment, TrustEnvironmentBuilder},
    error::{Error, Result},
    exceptions::Exceptions,
    options::{
        EvaluationOptions, DEFAULT_MAX_PATHS, DEFAULT_MAX_PATH_LENGTH,
        DEFAULT_RESULT_LIFETIME_SECS,
    },
    path::{CertificatePath, VerifyStatus},
    policy::{
        CertificateDetail, Policy, PolicyCheck, PolicyEvaluator, PolicyKind, PolicyOutcome,
        StandardPolicyEvaluator,
    },
    properties::{CertificateProperties, FailureCategory},
    result::{TrustInfo, TrustResult, TrustResultType},
    source::{FetchError, IssuerFetcher},
    store::{CertificateStore, CertificateTable},
    x509::Certificate,
};
