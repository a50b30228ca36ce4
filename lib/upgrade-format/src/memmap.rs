// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Memory map embedded in the bootloader image.
//!
//! A small tag-delimited binary descriptor of the flash layout:
//!
//! ```text
//! <memory_map:lebin> elem_size:u8 elem_0 elem_1 elem_2 ... </memory_map:lebin>
//! ```
//!
//! Elements are little-endian unsigned integers of `elem_size` (4 or 8)
//! bytes each. Only the first three are interpreted; extra elements are
//! tolerated for forward compatibility, fewer is an error.

use crate::error::Error;
use crate::section::MAX_PAYLOAD_SIZE;

/// Opening tag.
pub const MEMMAP_TAG: &[u8] = b"<memory_map:lebin>";
/// Closing tag.
pub const MEMMAP_TAG_CLOSE: &[u8] = b"</memory_map:lebin>";

/// Minimum length of the blob between the tags (size byte + one element).
const MEMMAP_MIN_LEN: usize = 1 + 4;
/// Maximum length of the blob between the tags.
const MEMMAP_MAX_LEN: usize = 1 + 256;

/// Decoded flash layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMap {
    /// Size of the bootloader region, `1..=16 MiB`.
    pub bootloader_size: u64,
    /// Start address of the main firmware; unconstrained.
    pub main_firmware_start: u64,
    /// Size of the main firmware region, `1..=16 MiB`.
    pub main_firmware_size: u64,
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

fn check_range(value: u64, min: u64, max: u64) -> Result<u64, Error> {
    if value < min || value > max {
        return Err(Error::ElementOutOfRange);
    }
    Ok(value)
}

impl MemoryMap {
    /// Locates and decodes the memory map embedded in `firmware`.
    pub fn decode(firmware: &[u8]) -> Result<Self, Error> {
        if firmware.len() as u64 > u64::from(MAX_PAYLOAD_SIZE) {
            return Err(Error::PayloadTooLarge);
        }

        let start = find(firmware, MEMMAP_TAG, 0)
            .ok_or(Error::MissingMemoryMap)?
            + MEMMAP_TAG.len();
        if find(firmware, MEMMAP_TAG, start).is_some() {
            return Err(Error::MultipleMemoryMaps);
        }
        let end = find(firmware, MEMMAP_TAG_CLOSE, start)
            .ok_or(Error::MissingClosingTag)?;

        let blob = &firmware[start..end];
        if blob.len() < MEMMAP_MIN_LEN || blob.len() > MEMMAP_MAX_LEN {
            return Err(Error::InvalidMemoryMap);
        }
        let elem_size = blob[0] as usize;
        if elem_size != 4 && elem_size != 8 {
            return Err(Error::InvalidMemoryMap);
        }
        let elems = &blob[1..];
        if elems.len() % elem_size != 0 || elems.len() / elem_size < 3 {
            return Err(Error::InvalidMemoryMap);
        }

        let elem = |i: usize| -> u64 {
            let mut bytes = [0u8; 8];
            bytes[..elem_size]
                .copy_from_slice(&elems[i * elem_size..(i + 1) * elem_size]);
            u64::from_le_bytes(bytes)
        };
        let size_max = u64::from(MAX_PAYLOAD_SIZE);
        Ok(Self {
            bootloader_size: check_range(elem(0), 1, size_max)?,
            main_firmware_start: elem(1),
            main_firmware_size: check_range(elem(2), 1, size_max)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ref_firmware() -> Vec<u8> {
        let mut fw = Vec::new();
        fw.extend_from_slice(
            b"Lorem ipsum dolor sit amet, consectetur adipiscing elit.",
        );
        fw.extend_from_slice(MEMMAP_TAG);
        fw.push(0x04); // elem_size
        fw.extend_from_slice(&[0x51, 0x86, 0xf6, 0x00]); // bootloader_size
        fw.extend_from_slice(&[0x4b, 0xca, 0x9b, 0xa3]); // main_firmware_start
        fw.extend_from_slice(&[0x7c, 0xe6, 0xe9, 0x00]); // main_firmware_size
        fw.extend_from_slice(MEMMAP_TAG_CLOSE);
        fw.extend_from_slice(
            b"Sed ornare tincidunt pharetra. Mauris at molestie quam, et",
        );
        fw
    }

    #[test]
    fn reference_map() {
        let map = MemoryMap::decode(&ref_firmware()).unwrap();
        assert_eq!(
            map,
            MemoryMap {
                bootloader_size: 0x00f6_8651,
                main_firmware_start: 0xa39b_ca4b,
                main_firmware_size: 0x00e9_e67c,
            }
        );
    }

    #[test]
    fn missing_map() {
        assert_eq!(
            MemoryMap::decode(b"no map here"),
            Err(Error::MissingMemoryMap)
        );
    }

    #[test]
    fn duplicate_map() {
        let mut fw = ref_firmware();
        fw.extend_from_slice(MEMMAP_TAG);
        assert_eq!(MemoryMap::decode(&fw), Err(Error::MultipleMemoryMaps));
    }

    #[test]
    fn missing_closing_tag() {
        let mut fw = Vec::new();
        fw.extend_from_slice(MEMMAP_TAG);
        fw.push(0x04);
        fw.extend_from_slice(&[0u8; 12]);
        assert_eq!(MemoryMap::decode(&fw), Err(Error::MissingClosingTag));
    }

    #[test]
    fn bad_element_size() {
        let mut fw = Vec::new();
        fw.extend_from_slice(MEMMAP_TAG);
        fw.push(0x02);
        fw.extend_from_slice(&[1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0]);
        fw.extend_from_slice(MEMMAP_TAG_CLOSE);
        assert_eq!(MemoryMap::decode(&fw), Err(Error::InvalidMemoryMap));
    }

    #[test]
    fn too_few_elements() {
        let mut fw = Vec::new();
        fw.extend_from_slice(MEMMAP_TAG);
        fw.push(0x04);
        fw.extend_from_slice(&[1, 0, 0, 0, 1, 0, 0, 0]);
        fw.extend_from_slice(MEMMAP_TAG_CLOSE);
        assert_eq!(MemoryMap::decode(&fw), Err(Error::InvalidMemoryMap));
    }

    #[test]
    fn ragged_length() {
        let mut fw = Vec::new();
        fw.extend_from_slice(MEMMAP_TAG);
        fw.push(0x04);
        fw.extend_from_slice(&[1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1]);
        fw.extend_from_slice(MEMMAP_TAG_CLOSE);
        assert_eq!(MemoryMap::decode(&fw), Err(Error::InvalidMemoryMap));
    }

    #[test]
    fn eight_byte_elements() {
        let mut fw = Vec::new();
        fw.extend_from_slice(MEMMAP_TAG);
        fw.push(0x08);
        fw.extend_from_slice(&0x10000u64.to_le_bytes());
        fw.extend_from_slice(&0x0800_4000u64.to_le_bytes());
        fw.extend_from_slice(&0xe0000u64.to_le_bytes());
        fw.extend_from_slice(MEMMAP_TAG_CLOSE);
        let map = MemoryMap::decode(&fw).unwrap();
        assert_eq!(map.bootloader_size, 0x10000);
        assert_eq!(map.main_firmware_start, 0x0800_4000);
        assert_eq!(map.main_firmware_size, 0xe0000);
    }

    #[test]
    fn extra_elements_tolerated() {
        let mut fw = Vec::new();
        fw.extend_from_slice(MEMMAP_TAG);
        fw.push(0x04);
        fw.extend_from_slice(&[1, 0, 0, 0]);
        fw.extend_from_slice(&[2, 0, 0, 0]);
        fw.extend_from_slice(&[3, 0, 0, 0]);
        fw.extend_from_slice(&[0xff; 4]); // uninterpreted
        fw.extend_from_slice(MEMMAP_TAG_CLOSE);
        let map = MemoryMap::decode(&fw).unwrap();
        assert_eq!(map.bootloader_size, 1);
        assert_eq!(map.main_firmware_start, 2);
        assert_eq!(map.main_firmware_size, 3);
    }

    #[test]
    fn out_of_range_elements() {
        let too_big = u64::from(MAX_PAYLOAD_SIZE) + 1;

        let mut fw = Vec::new();
        fw.extend_from_slice(MEMMAP_TAG);
        fw.push(0x08);
        fw.extend_from_slice(&too_big.to_le_bytes());
        fw.extend_from_slice(&1u64.to_le_bytes());
        fw.extend_from_slice(&1u64.to_le_bytes());
        fw.extend_from_slice(MEMMAP_TAG_CLOSE);
        assert_eq!(MemoryMap::decode(&fw), Err(Error::ElementOutOfRange));

        let mut fw = Vec::new();
        fw.extend_from_slice(MEMMAP_TAG);
        fw.push(0x04);
        fw.extend_from_slice(&[1, 0, 0, 0]);
        fw.extend_from_slice(&[0, 0, 0, 0]); // start may be zero
        fw.extend_from_slice(&[0, 0, 0, 0]); // size may not
        fw.extend_from_slice(MEMMAP_TAG_CLOSE);
        assert_eq!(MemoryMap::decode(&fw), Err(Error::ElementOutOfRange));
    }
}
