// Copyright (c) 2023 The MobileCoin Foundation

//! X509 distinguished names in a canonical, comparable form.
//!
//! Issuer and subject names are compared as described in
//! [7.1](https://datatracker.ietf.org/doc/html/rfc5280#section-7.1) of
//! [RFC5280](https://datatracker.ietf.org/doc/html/rfc5280):
//!
//! ```ignore
//!     Name ::= RDNSequence
//!     RDNSequence ::= SEQUENCE OF RelativeDistinguishedName
//!     RelativeDistinguishedName ::= SET OF AttributeTypeAndValue
//!     AttributeTypeAndValue ::= SEQUENCE {
//!         AttributeType,
//!         AttributeValue
//!     }
//! ```
//!
//! `PrintableString`, `UTF8String` and `IA5String` values go through the
//! [RFC4518](https://www.rfc-editor.org/rfc/rfc4518) string preparation
//! followed by Unicode default case folding. Every other string type is
//! compared on its exact encoding.
//!
//! The resulting [`NormalizedName`] is hashable so it can key the
//! subject indices of certificate sources and stores.

use const_oid::ObjectIdentifier;
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;
use x509_cert::attr::AttributeValue;
use x509_cert::der::asn1::{Ia5StringRef, PrintableStringRef, Utf8StringRef};
use x509_cert::der::{Tag, Tagged};
use x509_cert::name::Name;

/// A distinguished name prepared for comparison.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct NormalizedName(Vec<Vec<NormalizedAttribute>>);

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct NormalizedAttribute {
    oid: ObjectIdentifier,
    value: NormalizedValue,
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
enum NormalizedValue {
    Text(String),
    Raw { tag: u8, bytes: Vec<u8> },
}

impl NormalizedName {
    /// SHA-256 digest of the normalized form.
    ///
    /// Two names that compare equal always have the same digest.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for rdn in &self.0 {
            hasher.update(b"/");
            for attribute in rdn {
                let oid = attribute.oid.as_bytes();
                hasher.update((oid.len() as u32).to_be_bytes());
                hasher.update(oid);
                let (kind, bytes) = match &attribute.value {
                    NormalizedValue::Text(text) => (0u8, text.as_bytes()),
                    NormalizedValue::Raw { tag, bytes } => (*tag, bytes.as_slice()),
                };
                hasher.update([kind]);
                hasher.update((bytes.len() as u32).to_be_bytes());
                hasher.update(bytes);
            }
        }
        hasher.finalize().into()
    }

    /// Returns `true` for a name without any relative distinguished names.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&Name> for NormalizedName {
    fn from(name: &Name) -> Self {
        let rdns = name
            .0
            .iter()
            .map(|rdn| {
                let mut attributes = rdn
                    .0
                    .iter()
                    .map(|attribute| NormalizedAttribute {
                        oid: attribute.oid,
                        value: NormalizedValue::from(&attribute.value),
                    })
                    .collect::<Vec<_>>();
                // A RDN is a SET so the attribute order is not significant
                attributes.sort_by(|a, b| {
                    a.oid
                        .as_bytes()
                        .cmp(b.oid.as_bytes())
                        .then_with(|| a.value.cmp(&b.value))
                });
                attributes
            })
            .collect();
        Self(rdns)
    }
}

impl From<&AttributeValue> for NormalizedValue {
    fn from(value: &AttributeValue) -> Self {
        match directory_string(value) {
            Some(text) => NormalizedValue::Text(prepare(text)),
            None => NormalizedValue::Raw {
                tag: value.tag().octet(),
                bytes: value.value().to_vec(),
            },
        }
    }
}

/// The string contents of `value` when it is one of the supported
/// `DirectoryString` choices.
fn directory_string(value: &AttributeValue) -> Option<&str> {
    match value.tag() {
        Tag::PrintableString => PrintableStringRef::try_from(value)
            .ok()
            .map(|s| s.as_str()),
        Tag::Utf8String => Utf8StringRef::try_from(value).ok().map(|s| s.as_str()),
        Tag::Ia5String => Ia5StringRef::try_from(value).ok().map(|s| s.as_str()),
        _ => None,
    }
}

/// First value of the attribute `oid` in `name` as a string.
pub(crate) fn attribute_string(name: &Name, oid: ObjectIdentifier) -> Option<String> {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|attribute| attribute.oid == oid)
        .and_then(|attribute| directory_string(&attribute.value))
        .map(str::to_owned)
}

/// Prepare `value` for a caseless match.
///
/// This is the RFC4518 map, normalize and insignificant space handling steps
/// with the case folding applied before the spaces are compressed.
fn prepare(value: &str) -> String {
    let normalized = value
        .chars()
        .filter_map(map_character)
        .nfkc()
        .collect::<String>();
    let folded = caseless::default_case_fold_str(&normalized);
    compress_spaces(&folded)
}

/// Step 2 of <https://www.rfc-editor.org/rfc/rfc4518#section-2.2>.
///
/// White space maps to a single space, the listed control and formatting
/// code points map to nothing.
///
/// The RFC lists the variation selectors as `FF00-FE0F`, that should be
/// `FE00-FE0F` as per <https://www.rfc-editor.org/rfc/rfc3454#appendix-B.1>
fn map_character(c: char) -> Option<char> {
    if c.is_whitespace() {
        return Some(' ');
    }
    match c {
        '\u{0000}'..='\u{0008}'
        | '\u{000E}'..='\u{001F}'
        | '\u{007F}'..='\u{0084}'
        | '\u{0086}'..='\u{009F}'
        | '\u{00AD}'
        | '\u{034F}'
        | '\u{06DD}'
        | '\u{070F}'
        | '\u{1806}'
        | '\u{180B}'..='\u{180E}'
        | '\u{200B}'..='\u{200F}'
        | '\u{202A}'..='\u{202E}'
        | '\u{2060}'..='\u{2063}'
        | '\u{206A}'..='\u{206F}'
        | '\u{FE00}'..='\u{FE0F}'
        | '\u{FEFF}'
        | '\u{FFF9}'..='\u{FFFC}'
        | '\u{1D173}'..='\u{1D17A}'
        | '\u{E0001}'
        | '\u{E0020}'..='\u{E0074}' => None,
        c => Some(c),
    }
}

/// <https://www.rfc-editor.org/rfc/rfc4518#section-2.6.1>
///
/// The result starts and ends with one space and every run of inner spaces
/// becomes exactly two, so an empty or all space input is two spaces.
fn compress_spaces(value: &str) -> String {
    let words = value
        .split(' ')
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>();
    format!(" {} ", words.join("  "))
}
