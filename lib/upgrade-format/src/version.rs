// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Payload version numbers and the embedded version tag.
//!
//! Firmware images carry their version as a ten-digit decimal number wrapped
//! in an XML-like tag pair somewhere inside the image:
//!
//! ```text
//! <version:tag10>0102213405</version:tag10>
//! ```
//!
//! The number decomposes as `MM mmm ppp rr`: major = v / 100_000_000,
//! minor = (v / 100_000) % 1000, patch = (v / 100) % 1000, rc = v % 100.
//! An rc field of 99 means a release build (no suffix); anything else is a
//! release candidate. Zero is the reserved "not available" value.

use crate::error::Error;

/// Version is not available.
pub const VERSION_NA: u32 = 0;
/// Minimum allowed version number.
pub const VERSION_MIN: u32 = 1;
/// Maximum allowed version number.
pub const VERSION_MAX: u32 = 4_199_999_999;

/// Opening version tag embedded somewhere inside payload firmware.
pub const VERSION_TAG: &[u8] = b"<version:tag10>";
/// Closing version tag.
pub const VERSION_TAG_CLOSE: &[u8] = b"</version:tag10>";
/// Number of decimal digits in ASCII encoding, following the version tag.
const VERSION_DIGITS: usize = 10;

/// Checks if a version number is valid; `allow_na` additionally accepts the
/// reserved "not available" value.
pub fn is_version_valid(version: u32, allow_na: bool) -> bool {
    (allow_na && version == VERSION_NA)
        || (VERSION_MIN..=VERSION_MAX).contains(&version)
}

fn version_string(version: u32, rc_prefix: &str) -> Result<String, Error> {
    if !is_version_valid(version, true) {
        return Err(Error::VersionOutOfRange);
    }
    if version == VERSION_NA {
        return Ok(String::new());
    }

    let major = version / 100_000_000;
    let minor = version / 100_000 % 1000;
    let patch = version / 100 % 1000;
    let rc = version % 100;
    let mut s = format!("{major}.{minor}.{patch}");
    if rc != 99 {
        s.push_str(rc_prefix);
        s.push_str(&rc.to_string());
    }
    Ok(s)
}

/// Human-readable form, e.g. `1.22.134-rc5`. The "not available" version
/// renders as an empty string.
pub fn display_string(version: u32) -> Result<String, Error> {
    version_string(version, "-rc")
}

/// Form used inside the signing message, e.g. `1.22.134rc5` (no dash). The
/// "not available" version is invalid here.
pub fn signing_string(version: u32) -> Result<String, Error> {
    if version == VERSION_NA {
        return Err(Error::VersionNotAvailable);
    }
    version_string(version, "rc")
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

/// Scans firmware for the embedded version tag.
///
/// Returns [`VERSION_NA`] when no tag is present. Exactly one well-formed
/// tag pair yields the decoded number; a second opening tag anywhere in the
/// image is an error, as is a tag with malformed digits or a missing
/// closing tag.
pub fn find_payload_version(firmware: &[u8]) -> Result<u32, Error> {
    let Some(idx) = find(firmware, VERSION_TAG, 0) else {
        return Ok(VERSION_NA);
    };
    if find(firmware, VERSION_TAG, idx + 1).is_some() {
        return Err(Error::DuplicateVersionTag);
    }

    let digits_at = idx + VERSION_TAG.len();
    if firmware.len() < digits_at + VERSION_DIGITS + VERSION_TAG_CLOSE.len() {
        return Err(Error::CorruptedVersionTag);
    }

    let digits = &firmware[digits_at..digits_at + VERSION_DIGITS];
    let mut version: u64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return Err(Error::CorruptedVersionTag);
        }
        version = version * 10 + u64::from(b - b'0');
    }
    let version = u32::try_from(version).map_err(|_| Error::VersionOutOfRange)?;
    if !is_version_valid(version, false) {
        return Err(Error::VersionOutOfRange);
    }

    let close_at = digits_at + VERSION_DIGITS;
    if &firmware[close_at..close_at + VERSION_TAG_CLOSE.len()] != VERSION_TAG_CLOSE {
        return Err(Error::CorruptedVersionTag);
    }

    Ok(version)
}
