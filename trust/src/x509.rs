// Copyright (c) 2023 The MobileCoin Foundation

//! X509 certificate primitives used while building certification paths

mod algorithm;
mod certificate;
mod error;
mod name;

pub use algorithm::{PublicKey, RsaDigest, Signature};
pub use certificate::Certificate;
pub use error::Error;
pub use name::NormalizedName;

pub(crate) use algorithm::{is_weak_signature_algorithm, OID_EC_PUBLIC_KEY};

/// Result of working with certificates
pub type Result<T> = core::result::Result<T, Error>;
