// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integrity check record.
//!
//! A compact 32-byte trailer appended at a fixed offset from the end of a
//! flash region, validated by boot code before any section parsing is
//! attempted. It carries no name or attribute list; the boot-time check
//! has to fit in minimal code.

use static_assertions::const_assert_eq;
use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::crc::crc32;
use crate::error::Error;
use crate::section::MAX_PAYLOAD_SIZE;
use crate::version;

/// Magic word, `"INTG"` in little-endian.
pub const ICR_MAGIC: u32 = 0x4754_4E49;
/// Current revision of the record structure.
pub const ICR_STRUCT_REV: u32 = 1;
/// Serialized size of the record.
pub const ICR_SIZE: usize = 32;
/// Offset of the record from the end of a firmware flash section (the
/// record is followed by a 32-byte version check record slot).
pub const ICR_OFFSET_FROM_END: usize = 64;

/// Size and CRC of one protected byte range.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
    Unaligned,
)]
#[repr(C, packed)]
pub struct IcrSect {
    pl_size: U32,
    pl_crc: U32,
}

/// The 32-byte integrity check record.
///
/// All words little-endian; `struct_crc` covers the first 28 bytes. The
/// auxiliary section is reserved for a second protected region (e.g. a
/// combined bootloader+firmware image) and is zero otherwise.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
    Unaligned,
)]
#[repr(C, packed)]
pub struct IntegrityCheckRecord {
    magic: U32,
    struct_rev: U32,
    pl_ver: U32,
    main_sect: IcrSect,
    aux_sect: IcrSect,
    struct_crc: U32,
}

const_assert_eq!(core::mem::size_of::<IntegrityCheckRecord>(), ICR_SIZE);

impl IntegrityCheckRecord {
    const CRC_LEN: usize = 4;

    /// Builds the record protecting `firmware`, extracting the payload
    /// version with the same tag scan used for payload sections.
    pub fn create(firmware: &[u8]) -> Result<Self, Error> {
        if firmware.len() as u64 > u64::from(MAX_PAYLOAD_SIZE) {
            return Err(Error::PayloadTooLarge);
        }
        let pl_ver = version::find_payload_version(firmware)?;
        let mut record = Self {
            magic: U32::new(ICR_MAGIC),
            struct_rev: U32::new(ICR_STRUCT_REV),
            pl_ver: U32::new(pl_ver),
            main_sect: IcrSect {
                pl_size: U32::new(firmware.len() as u32),
                pl_crc: U32::new(crc32(firmware)),
            },
            aux_sect: IcrSect { pl_size: U32::new(0), pl_crc: U32::new(0) },
            struct_crc: U32::new(0),
        };
        let crc = crc32(&record.as_bytes()[..ICR_SIZE - Self::CRC_LEN]);
        record.struct_crc.set(crc);
        Ok(record)
    }

    /// Reads back a record, validating magic, revision, and CRC.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < ICR_SIZE {
            return Err(Error::BufferTooShort);
        }
        let record = Self::read_from_bytes(&bytes[..ICR_SIZE])
            .map_err(|_| Error::BufferTooShort)?;
        if record.magic.get() != ICR_MAGIC
            || record.struct_rev.get() != ICR_STRUCT_REV
        {
            return Err(Error::InvalidIntegrityRecord);
        }
        let crc = crc32(&record.as_bytes()[..ICR_SIZE - Self::CRC_LEN]);
        if crc != record.struct_crc.get() {
            return Err(Error::InvalidIntegrityRecord);
        }
        Ok(record)
    }

    /// Checks `firmware` against the main protected range.
    pub fn verify(&self, firmware: &[u8]) -> bool {
        firmware.len() as u64 == u64::from(self.main_sect.pl_size.get())
            && crc32(firmware) == self.main_sect.pl_crc.get()
    }

    pub fn version(&self) -> u32 {
        self.pl_ver.get()
    }
}
