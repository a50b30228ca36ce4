// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Canonical signing-message construction.
//!
//! The message signers actually sign binds the exact ordered payload
//! contents and their versions:
//!
//! 1. each payload section contributes its brief name and signing-form
//!    version to a human-readable prefix (`boot` → `b`, `main` → ``),
//! 2. the serialized sections are hashed individually, the hashes
//!    concatenated in order, and hashed once more,
//! 3. the final hash is regrouped into 5-bit values and Bech32-encoded
//!    under the prefix.
//!
//! Reordering sections, changing a payload byte, or changing a version all
//! change the resulting ASCII message.

use bech32::{u5, Variant};
use sha2::{Digest, Sha256};
use upgrade_format::PayloadSection;

use crate::error::Error;

/// Brief section name used in the message prefix; only `boot` and `main`
/// payload sections may be signed.
pub fn brief_name(name: &str) -> Option<&'static str> {
    match name {
        "boot" => Some("b"),
        "main" => Some(""),
        _ => None,
    }
}

/// Regroups bytes into 5-bit values, MSB first, zero-padding the final
/// group. Produces exactly `ceil(len * 8 / 5)` groups.
pub fn bytes_to_5bit(data: &[u8]) -> Vec<u8> {
    let n_groups = (data.len() * 8).div_ceil(5);
    let mut out = Vec::with_capacity(n_groups);
    let mut acc: u32 = 0;
    let mut bits = 0;
    for &byte in data.iter().chain(core::iter::once(&0u8)) {
        acc = (acc << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 && out.len() < n_groups {
            bits -= 5;
            out.push(((acc >> bits) & 0x1f) as u8);
        }
    }
    out
}

/// Builds the message to be signed from the ordered payload sections.
pub fn make_signature_message(
    sections: &[&PayloadSection],
) -> Result<Vec<u8>, Error> {
    if sections.is_empty() {
        return Err(Error::NoPayloadSections);
    }

    let mut hrp = String::new();
    let mut hash_input = Vec::with_capacity(sections.len() * 32);
    for section in sections {
        let brief = brief_name(section.name())
            .ok_or(Error::UnsupportedSectionForSigning)?;
        hrp.push_str(brief);
        hrp.push_str(&section.signing_version_str()?);
        hrp.push('-');
        hash_input.extend_from_slice(&Sha256::digest(section.serialize()));
    }
    let digest = Sha256::digest(&hash_input);

    let data = bytes_to_5bit(&digest)
        .into_iter()
        .map(u5::try_from_u8)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| Error::MessageEncoding)?;
    let encoded = bech32::encode(&hrp, data, Variant::Bech32)
        .map_err(|_| Error::MessageEncoding)?;
    Ok(encoded.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bech32::FromBase32;
    use proptest::prelude::*;

    fn boot_section() -> PayloadSection {
        PayloadSection::new(
            "boot",
            b"Bootloader<version:tag10>0102213405</version:tag10>".to_vec(),
        )
        .unwrap()
    }

    fn main_section() -> PayloadSection {
        PayloadSection::new(
            "main",
            b"Main<version:tag10>0200000199</version:tag10>".to_vec(),
        )
        .unwrap()
    }

    #[test]
    fn regroup_vectors() {
        assert_eq!(bytes_to_5bit(&[0xab, 0xc1]), vec![21, 15, 0, 16]);
        assert_eq!(
            bytes_to_5bit(&[0x01, 0x02, 0x03, 0x04, 0x05]),
            vec![0, 4, 1, 0, 6, 1, 0, 5]
        );
        assert_eq!(bytes_to_5bit(&[]), Vec::<u8>::new());
    }

    proptest! {
        #[test]
        fn regroup_group_count(data: Vec<u8>) {
            let groups = bytes_to_5bit(&data);
            prop_assert_eq!(groups.len(), (data.len() * 8).div_ceil(5));
            prop_assert!(groups.iter().all(|&g| g < 32));
        }

        #[test]
        fn regroup_preserves_bits(data: Vec<u8>) {
            // Reassembling the groups MSB-first must give back the input
            // followed only by zero padding.
            let groups = bytes_to_5bit(&data);
            let mut bits = Vec::with_capacity(groups.len() * 5);
            for g in groups {
                for i in (0..5).rev() {
                    bits.push((g >> i) & 1);
                }
            }
            let mut bytes = Vec::new();
            for chunk in bits.chunks_exact(8) {
                bytes.push(chunk.iter().fold(0u8, |acc, &b| (acc << 1) | b));
            }
            prop_assert_eq!(&bytes[..data.len()], &data[..]);
            prop_assert!(bytes[data.len()..].iter().all(|&b| b == 0));
            prop_assert!(bits[bytes.len() * 8..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn message_decodes_back_to_section_hash() {
        let boot = boot_section();
        let main = main_section();
        let message = make_signature_message(&[&boot, &main]).unwrap();
        let message = String::from_utf8(message).unwrap();

        let (hrp, data, variant) = bech32::decode(&message).unwrap();
        assert_eq!(variant, Variant::Bech32);
        assert_eq!(hrp, "b1.22.134rc5-2.0.1-");
        assert_eq!(data.len(), 52);

        // 52 groups are 256 hash bits plus 4 zero padding bits.
        let recovered = Vec::<u8>::from_base32(&data).unwrap();
        let mut hash_input = Vec::new();
        hash_input.extend_from_slice(&Sha256::digest(boot.serialize()));
        hash_input.extend_from_slice(&Sha256::digest(main.serialize()));
        let expected: [u8; 32] = Sha256::digest(&hash_input).into();
        assert_eq!(recovered, expected);
    }

    #[test]
    fn message_is_deterministic() {
        let a = make_signature_message(&[&boot_section(), &main_section()])
            .unwrap();
        let b = make_signature_message(&[&boot_section(), &main_section()])
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn message_depends_on_order() {
        let boot = boot_section();
        let main = main_section();
        let ab = make_signature_message(&[&boot, &main]).unwrap();
        let ba = make_signature_message(&[&main, &boot]).unwrap();
        assert_ne!(ab, ba);
    }

    #[test]
    fn message_depends_on_payload_bytes() {
        let boot = boot_section();
        let other = PayloadSection::new(
            "boot",
            b"bootloader<version:tag10>0102213405</version:tag10>".to_vec(),
        )
        .unwrap();
        let main = main_section();
        let a = make_signature_message(&[&boot, &main]).unwrap();
        let b = make_signature_message(&[&other, &main]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn unsupported_section_name() {
        let odd = PayloadSection::new(
            "extra",
            b"x<version:tag10>0102213405</version:tag10>".to_vec(),
        )
        .unwrap();
        assert_eq!(
            make_signature_message(&[&odd]),
            Err(Error::UnsupportedSectionForSigning)
        );
    }

    #[test]
    fn version_required_for_signing() {
        let unversioned =
            PayloadSection::new("boot", b"no tag".to_vec()).unwrap();
        assert_eq!(
            make_signature_message(&[&unversioned]),
            Err(Error::Format(upgrade_format::Error::VersionNotAvailable))
        );
    }

    #[test]
    fn empty_section_list() {
        assert_eq!(
            make_signature_message(&[]),
            Err(Error::NoPayloadSections)
        );
    }
}
