// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Multisignature authentication for firmware upgrade files.
//!
//! Builds the canonical signing message from an upgrade file's payload
//! sections, signs it with secp256k1 keys (directly or via imported
//! Bitcoin-convention recoverable signatures), and maintains the
//! fingerprint → signature records of the file's signature section. The
//! container format itself lives in `upgrade-format`.
//!
//! This crate records which fingerprints signed; threshold-of-N policy is
//! enforced by the device bootloader, not here.

pub mod crypto;
pub mod error;
pub mod keys;
pub mod message;
pub mod multisig;

pub use crypto::{PublicKey, PUBKEY_LEN, SECKEY_LEN};
pub use error::{Error, ErrorKind};
pub use message::make_signature_message;
pub use multisig::{
    add_signature, deserialize_sections, import_signature, normalize_sections,
    serialize_sections, sign, signature_message,
};
