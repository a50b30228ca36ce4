// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Firmware upgrade container format.
//!
//! An upgrade file is a concatenation of self-describing sections: a fixed
//! 256-byte header (magic, revision, name, payload version/size/CRC, a TLV
//! attribute list, and a header CRC) followed by the payload bytes. Payload
//! sections carry firmware images; the single `"sign"` section carries
//! fingerprint → signature records. Two simpler artifacts live alongside
//! the section format: the 32-byte integrity check record appended to raw
//! flash images, and the memory-map descriptor embedded in the bootloader.
//!
//! This crate owns the bit-exact formats only. Signing-message construction
//! and multisignature assembly live in `upgrade-sign`.

pub mod attrs;
pub mod crc;
pub mod error;
pub mod icr;
pub mod memmap;
pub mod section;
pub mod version;

pub use error::{Error, ErrorKind, HeaderDefect};
pub use icr::IntegrityCheckRecord;
pub use memmap::MemoryMap;
pub use section::{
    PayloadSection, Section, SectionHeader, SignatureSection,
    DSA_SECP256K1_SHA256, FINGERPRINT_LEN, MAX_PAYLOAD_SIZE, SIGNATURE_LEN,
    SIGN_SECTION_NAME,
};
