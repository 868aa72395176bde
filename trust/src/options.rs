// Copyright (c) 2023 The MobileCoin Foundation

//! Options controlling an evaluation

use crate::Error;
use serde::{Deserialize, Serialize};

/// How far a path may grow by default
pub const DEFAULT_MAX_PATH_LENGTH: usize = 15;
/// How many paths a search may build by default
pub const DEFAULT_MAX_PATHS: usize = 100;
/// How long a verdict stays current by default, in seconds
pub const DEFAULT_RESULT_LIFETIME_SECS: u64 = 3600;

/// Options for building and evaluating certification paths
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct EvaluationOptions {
    /// Only the supplied anchors are trusted
    pub anchors_only: bool,
    /// Issuers may be fetched over the network
    pub allow_network: bool,
    /// Only check the leaf, no path is built
    pub leaf_only: bool,
    /// The most certificates in a path
    pub max_path_length: usize,
    /// The most paths a search builds before it stops extending them
    pub max_paths: usize,
    /// How long a verdict stays current, in seconds
    pub result_lifetime_secs: u64,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            anchors_only: false,
            allow_network: false,
            leaf_only: false,
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
            max_paths: DEFAULT_MAX_PATHS,
            result_lifetime_secs: DEFAULT_RESULT_LIFETIME_SECS,
        }
    }
}

impl TryFrom<&str> for EvaluationOptions {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let options = serde_json::from_str(value)?;
        Ok(options)
    }
}
