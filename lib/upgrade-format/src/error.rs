// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the upgrade container format.
//!
//! Every codec in this crate fails fast: a corrupted section, record, or
//! attribute list is never best-effort decoded. The only tolerated leniency
//! is skipping unrecognized attribute keys and ignoring extra memory-map
//! elements beyond the first three.

/// Coarse classification of an [`Error`].
///
/// Callers often branch on the class rather than the precise variant: a
/// `Format` error means the input bytes are not a valid instance of the
/// structure, a `Range` error means a value fell outside its domain, and a
/// `Policy` error means the structural or authentication contract of the
/// format was violated by otherwise well-formed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Range,
    Policy,
}

/// Which header invariant a section failed during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderDefect {
    /// Magic word is not `SECT`.
    Magic,
    /// Structure revision is not in the supported set.
    Revision,
    /// Header CRC32 mismatch.
    Crc,
    /// Name is not NUL-terminated printable ASCII of at most 15 bytes.
    Name,
    /// Payload version is out of range.
    Version,
    /// Declared payload size exceeds the 16 MiB cap.
    PayloadSize,
    /// Attribute list does not decode.
    Attributes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Buffer ended before a complete header or payload could be read.
    BufferTooShort,
    /// Section header failed validation; never partially accepted.
    InvalidSection(HeaderDefect),
    /// Payload bytes do not match the CRC recorded in the header.
    PayloadCorrupted,

    /// Attribute name is not registered in the schema.
    UnknownAttribute,
    /// Attribute value type disagrees with the key's declared type.
    TypeMismatch,
    /// Attribute value (or the whole encoded list) exceeds its size limit.
    AttributeTooLarge,
    /// A TLV entry declares more bytes than remain in the list.
    AttributeOverflow,

    /// Version number outside `1..=4_199_999_999`.
    VersionOutOfRange,
    /// Version "not available" was used where a concrete version is required.
    VersionNotAvailable,
    /// Payload contains more than one version tag.
    DuplicateVersionTag,
    /// Version tag present but digits or closing tag are malformed.
    CorruptedVersionTag,

    /// Payload exceeds the 16 MiB cap.
    PayloadTooLarge,
    /// Section name longer than 15 bytes, or not ASCII.
    NameTooLong,
    /// `"sign"` is reserved for the signature section.
    ReservedSectionName,

    /// Signing algorithm is not in the supported set.
    UnsupportedAlgorithm,
    /// Signature payload length is not a multiple of the record size.
    MalformedSignaturePayload,
    /// Fingerprint or signature has the wrong length.
    InvalidRecordLength,

    /// Integrity check record has bad magic, revision, or CRC.
    InvalidIntegrityRecord,

    /// Firmware has no embedded memory map.
    MissingMemoryMap,
    /// Firmware contains more than one memory map.
    MultipleMemoryMaps,
    /// Memory map has no closing tag.
    MissingClosingTag,
    /// Memory map blob is structurally invalid.
    InvalidMemoryMap,
    /// A memory map element is outside its declared range.
    ElementOutOfRange,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BufferTooShort
            | Error::InvalidSection(_)
            | Error::PayloadCorrupted
            | Error::AttributeOverflow
            | Error::CorruptedVersionTag
            | Error::MalformedSignaturePayload
            | Error::InvalidIntegrityRecord
            | Error::MissingMemoryMap
            | Error::MissingClosingTag
            | Error::InvalidMemoryMap => ErrorKind::Format,

            Error::VersionOutOfRange
            | Error::AttributeTooLarge
            | Error::PayloadTooLarge
            | Error::NameTooLong
            | Error::InvalidRecordLength
            | Error::ElementOutOfRange => ErrorKind::Range,

            Error::UnknownAttribute
            | Error::TypeMismatch
            | Error::VersionNotAvailable
            | Error::DuplicateVersionTag
            | Error::ReservedSectionName
            | Error::UnsupportedAlgorithm
            | Error::MultipleMemoryMaps => ErrorKind::Policy,
        }
    }
}
