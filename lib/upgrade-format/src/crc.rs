// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CRC32 over byte ranges.
//!
//! Every structure in the container format embeds CRC32 values computed with
//! the standard reflected polynomial 0xEDB88320 (IEEE 802.3). The results
//! end up inside signed artifacts, so the algorithm must match bit-exactly
//! what the device-side boot code computes.

use crc::{Crc, CRC_32_ISO_HDLC};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub fn crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}
