// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Multisignature assembly for upgrade files.
//!
//! An upgrade file is zero or more payload sections followed by exactly one
//! signature section. Signing derives the canonical message from the
//! payload sections in file order, signs it, and records the signature
//! under the signer's fingerprint; a fingerprint may appear only once.
//! Externally produced recoverable signatures are imported by recovering
//! the public key from the signature itself — a caller-supplied key is
//! never trusted.

use upgrade_format::attrs::AttrSchema;
use upgrade_format::section::{
    CompactSignature, PayloadSection, Section, SignatureSection,
};
use upgrade_format::DSA_SECP256K1_SHA256;

use crate::crypto::{self, PublicKey, SECKEY_LEN};
use crate::error::Error;
use crate::message::make_signature_message;

/// Validates the section ordering and appends an empty signature section
/// when the file does not end with one.
pub fn normalize_sections(sections: &mut Vec<Section>) -> Result<(), Error> {
    if !matches!(sections.last(), Some(Section::Signature(_))) {
        sections.push(Section::Signature(SignatureSection::new(
            DSA_SECP256K1_SHA256,
        )?));
    }
    let payload_count = sections.len() - 1;
    for section in &sections[..payload_count] {
        if !matches!(section, Section::Payload(_)) {
            return Err(Error::SectionOrdering);
        }
    }
    Ok(())
}

fn payload_sections(sections: &[Section]) -> Result<Vec<&PayloadSection>, Error> {
    let mut payloads = Vec::new();
    for (i, section) in sections.iter().enumerate() {
        match section {
            Section::Payload(p) => payloads.push(p),
            Section::Signature(_) if i + 1 == sections.len() => {}
            Section::Signature(_) => return Err(Error::SectionOrdering),
        }
    }
    Ok(payloads)
}

/// The canonical signing message for the file's payload sections, in file
/// order. A trailing signature section is ignored; one anywhere else is an
/// ordering violation.
pub fn signature_message(sections: &[Section]) -> Result<Vec<u8>, Error> {
    make_signature_message(&payload_sections(sections)?)
}

/// Records a signature under the fingerprint of `pubkey`.
pub fn add_signature(
    sections: &mut Vec<Section>,
    signature: &CompactSignature,
    pubkey: &PublicKey,
) -> Result<(), Error> {
    normalize_sections(sections)?;
    let fingerprint = crypto::fingerprint(pubkey)?;
    let Some(Section::Signature(sig_section)) = sections.last_mut() else {
        return Err(Error::SectionOrdering);
    };
    if sig_section.contains(&fingerprint) {
        return Err(Error::AlreadySigned);
    }
    sig_section.insert(&fingerprint, signature)?;
    Ok(())
}

/// Signs the upgrade file with a private key.
pub fn sign(
    sections: &mut Vec<Section>,
    seckey: &[u8; SECKEY_LEN],
) -> Result<(), Error> {
    normalize_sections(sections)?;
    let message = signature_message(sections)?;
    let pubkey = crypto::derive_pubkey(seckey)?;
    let signature = crypto::sign(&message, seckey)?;
    add_signature(sections, &signature, &pubkey)
}

/// Imports an externally produced Bitcoin message signature (Base64). The
/// signer's public key is recovered from the signature and the file's own
/// signing message.
pub fn import_signature(
    sections: &mut Vec<Section>,
    signature_b64: &str,
) -> Result<(), Error> {
    normalize_sections(sections)?;
    let message = signature_message(sections)?;
    let (signature, pubkey) =
        crypto::parse_recoverable(signature_b64, &message)?;
    add_signature(sections, &signature, &pubkey)
}

/// Serializes an upgrade file: the plain concatenation of its sections.
pub fn serialize_sections(sections: &[Section]) -> Vec<u8> {
    let mut out = Vec::new();
    for section in sections {
        out.extend_from_slice(&section.serialize());
    }
    out
}

/// Parses an upgrade file buffer into its ordered section list.
pub fn deserialize_sections(
    buffer: &[u8],
    schema: &AttrSchema,
) -> Result<Vec<Section>, Error> {
    Ok(Section::deserialize_all(buffer, schema)?)
}
