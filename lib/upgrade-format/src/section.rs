// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sections of an upgrade file.
//!
//! An upgrade file is a plain concatenation of sections, each a fixed
//! 256-byte header followed by a variable payload. The header carries the
//! payload size and CRC plus a TLV attribute list, and is itself CRC'd over
//! its first 252 bytes. Section type is decided by name: `"sign"` is
//! reserved for the signature section, everything else is a payload
//! section carrying firmware bytes.
//!
//! Sections here are always-consistent value objects: constructors and
//! mutators recompute the payload and header CRCs immediately, so
//! [`serialize`](Section::serialize) is a pure concatenation and equality
//! is structural.

use core::fmt;
use std::collections::BTreeMap;

use static_assertions::const_assert_eq;
use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::attrs::{AttrSchema, AttrValue, Attrs, ATTR_ALGORITHM, ATTR_LIST_LEN};
use crate::crc::crc32;
use crate::error::{Error, HeaderDefect};
use crate::version;

/// Magic word, `"SECT"` in little-endian.
pub const SECTION_MAGIC: u32 = 0x5443_4553;
/// Current revision of the header structure.
pub const SECTION_STRUCT_REV: u32 = 1;
/// Revisions this implementation can deserialize.
const SUPPORTED_REVISIONS: &[u32] = &[1];
/// Maximum allowed payload size (16 MiB).
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;
/// Size of the name field, including the NUL terminator.
const NAME_LEN: usize = 16;
/// Reserved name of the signature section.
pub const SIGN_SECTION_NAME: &str = "sign";

/// Length of a public key fingerprint in bytes.
pub const FINGERPRINT_LEN: usize = 16;
/// Length of a compact ECDSA signature in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// Digital signature algorithm: ECDSA over secp256k1 with SHA-256.
pub const DSA_SECP256K1_SHA256: &str = "secp256k1-sha256";
/// Supported digital signature algorithms.
const SUPPORTED_ALGORITHMS: &[&str] = &[DSA_SECP256K1_SHA256];

/// First 16 bytes of SHA-256 of an uncompressed public key.
pub type Fingerprint = [u8; FINGERPRINT_LEN];
/// 64-byte `r ‖ s` ECDSA signature encoding.
pub type CompactSignature = [u8; SIGNATURE_LEN];

/// Fixed-size section header.
///
/// 256 bytes, packed, all words little-endian. `struct_crc` covers the
/// first 252 bytes.
#[derive(
    Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned,
)]
#[repr(C, packed)]
pub struct SectionHeader {
    magic: U32,
    struct_rev: U32,
    name: [u8; NAME_LEN],
    pl_ver: U32,
    pl_size: U32,
    pl_crc: U32,
    attr_list: [u8; ATTR_LIST_LEN],
    struct_crc: U32,
}

const_assert_eq!(core::mem::size_of::<SectionHeader>(), 256);

impl SectionHeader {
    /// Serialized size of the header.
    pub const SIZE: usize = core::mem::size_of::<Self>();
    const CRC_LEN: usize = 4;

    fn new(name: &str) -> Result<Self, Error> {
        let mut header = Self {
            magic: U32::new(SECTION_MAGIC),
            struct_rev: U32::new(SECTION_STRUCT_REV),
            name: [0; NAME_LEN],
            pl_ver: U32::new(version::VERSION_NA),
            pl_size: U32::new(0),
            pl_crc: U32::new(0),
            attr_list: [0; ATTR_LIST_LEN],
            struct_crc: U32::new(0),
        };
        header.set_name(name)?;
        Ok(header)
    }

    /// The section name, decoded from the NUL-terminated field.
    pub fn name_str(&self) -> Result<&str, Error> {
        let nul = self
            .name
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::NameTooLong)?;
        let s = core::str::from_utf8(&self.name[..nul])
            .map_err(|_| Error::NameTooLong)?;
        if !s.is_ascii() {
            return Err(Error::NameTooLong);
        }
        Ok(s)
    }

    fn set_name(&mut self, name: &str) -> Result<(), Error> {
        if name.len() > NAME_LEN - 1 || !name.is_ascii() || name.contains('\0')
        {
            return Err(Error::NameTooLong);
        }
        self.name = [0; NAME_LEN];
        self.name[..name.len()].copy_from_slice(name.as_bytes());
        Ok(())
    }

    /// The payload version recorded in the header.
    pub fn version(&self) -> u32 {
        self.pl_ver.get()
    }

    /// Decodes the attribute list.
    pub fn attrs(&self, schema: &AttrSchema) -> Result<Attrs, Error> {
        Attrs::decode(&self.attr_list, schema)
    }

    fn set_attrs(
        &mut self,
        attrs: &Attrs,
        schema: &AttrSchema,
    ) -> Result<(), Error> {
        self.attr_list = attrs.encode(schema)?;
        Ok(())
    }

    fn set_payload_info(&mut self, payload: &[u8]) {
        self.pl_size.set(payload.len() as u32);
        self.pl_crc.set(crc32(payload));
    }

    fn crc_input(&self) -> &[u8] {
        &self.as_bytes()[..Self::SIZE - Self::CRC_LEN]
    }

    fn update_crc(&mut self) {
        let crc = crc32(self.crc_input());
        self.struct_crc.set(crc);
    }

    fn check_crc(&self) -> bool {
        crc32(self.crc_input()) == self.struct_crc.get()
    }

    /// Validates every header invariant; any violation fails the whole
    /// section, never partially accepted.
    fn validate(&self, schema: &AttrSchema) -> Result<(), Error> {
        if self.magic.get() != SECTION_MAGIC {
            return Err(Error::InvalidSection(HeaderDefect::Magic));
        }
        if !SUPPORTED_REVISIONS.contains(&self.struct_rev.get()) {
            return Err(Error::InvalidSection(HeaderDefect::Revision));
        }
        if !self.check_crc() {
            return Err(Error::InvalidSection(HeaderDefect::Crc));
        }
        if self.name_str().is_err() {
            return Err(Error::InvalidSection(HeaderDefect::Name));
        }
        if !version::is_version_valid(self.pl_ver.get(), true) {
            return Err(Error::InvalidSection(HeaderDefect::Version));
        }
        if self.pl_size.get() > MAX_PAYLOAD_SIZE {
            return Err(Error::InvalidSection(HeaderDefect::PayloadSize));
        }
        if self.attrs(schema).is_err() {
            return Err(Error::InvalidSection(HeaderDefect::Attributes));
        }
        Ok(())
    }
}

impl PartialEq for SectionHeader {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for SectionHeader {}

impl fmt::Debug for SectionHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionHeader")
            .field("name", &self.name_str().unwrap_or("<invalid>"))
            .field("struct_rev", &self.struct_rev.get())
            .field("pl_ver", &self.pl_ver.get())
            .field("pl_size", &self.pl_size.get())
            .field("pl_crc", &self.pl_crc.get())
            .field("struct_crc", &self.struct_crc.get())
            .finish()
    }
}

/// A section carrying firmware bytes.
///
/// The payload version is derived, not set directly: the payload is scanned
/// for the embedded version tag at construction and on every payload
/// change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadSection {
    header: SectionHeader,
    payload: Vec<u8>,
}

impl PayloadSection {
    pub fn new(name: &str, payload: Vec<u8>) -> Result<Self, Error> {
        if name == SIGN_SECTION_NAME {
            return Err(Error::ReservedSectionName);
        }
        let header = SectionHeader::new(name)?;
        let mut section = Self { header, payload: Vec::new() };
        section.set_payload(payload)?;
        Ok(section)
    }

    /// Builds a payload section and sets its attributes in one step.
    pub fn with_attrs(
        name: &str,
        payload: Vec<u8>,
        attrs: &Attrs,
        schema: &AttrSchema,
    ) -> Result<Self, Error> {
        let mut section = Self::new(name, payload)?;
        section.set_attrs(attrs, schema)?;
        Ok(section)
    }

    fn from_parts(
        header: SectionHeader,
        payload: Vec<u8>,
    ) -> Result<Self, Error> {
        // The version recorded in the header must agree with what the
        // payload actually embeds.
        let scanned = version::find_payload_version(&payload)?;
        if scanned != header.pl_ver.get() {
            return Err(Error::InvalidSection(HeaderDefect::Version));
        }
        Ok(Self { header, payload })
    }

    pub fn name(&self) -> &str {
        self.header.name_str().unwrap_or("")
    }

    pub fn version(&self) -> u32 {
        self.header.version()
    }

    /// Human-readable version, empty when not available.
    pub fn version_str(&self) -> String {
        version::display_string(self.version()).unwrap_or_default()
    }

    /// Version in signing-message form; fails when no version is embedded.
    pub fn signing_version_str(&self) -> Result<String, Error> {
        version::signing_string(self.version())
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Replaces the payload, re-deriving version and CRCs.
    pub fn set_payload(&mut self, payload: Vec<u8>) -> Result<(), Error> {
        if payload.len() as u64 > u64::from(MAX_PAYLOAD_SIZE) {
            return Err(Error::PayloadTooLarge);
        }
        let ver = version::find_payload_version(&payload)?;
        self.header.pl_ver.set(ver);
        self.header.set_payload_info(&payload);
        self.header.update_crc();
        self.payload = payload;
        Ok(())
    }

    pub fn attrs(&self, schema: &AttrSchema) -> Result<Attrs, Error> {
        self.header.attrs(schema)
    }

    pub fn set_attrs(
        &mut self,
        attrs: &Attrs,
        schema: &AttrSchema,
    ) -> Result<(), Error> {
        self.header.set_attrs(attrs, schema)?;
        self.header.update_crc();
        Ok(())
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(SectionHeader::SIZE + self.payload.len());
        out.extend_from_slice(self.header.as_bytes());
        out.extend_from_slice(&self.payload);
        out
    }
}

/// One fingerprint → signature record in the signature section payload.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
struct SignatureRecord {
    fingerprint: [u8; FINGERPRINT_LEN],
    signature: [u8; SIGNATURE_LEN],
}

const_assert_eq!(core::mem::size_of::<SignatureRecord>(), 80);

/// A section carrying fingerprint → signature records.
///
/// Records serialize in the mapping's iteration order, which is sorted by
/// fingerprint; this makes the output bytes deterministic. Order carries no
/// meaning for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSection {
    header: SectionHeader,
    algorithm: String,
    signatures: BTreeMap<Fingerprint, CompactSignature>,
}

impl SignatureSection {
    /// Creates an empty signature section for the given algorithm.
    pub fn new(algorithm: &str) -> Result<Self, Error> {
        if !SUPPORTED_ALGORITHMS.contains(&algorithm) {
            return Err(Error::UnsupportedAlgorithm);
        }
        let mut header = SectionHeader::new(SIGN_SECTION_NAME)?;
        let mut attrs = Attrs::new();
        attrs.set(ATTR_ALGORITHM, AttrValue::Text(algorithm.to_string()));
        header.set_attrs(&attrs, &AttrSchema::default())?;
        header.set_payload_info(&[]);
        header.update_crc();
        Ok(Self {
            header,
            algorithm: algorithm.to_string(),
            signatures: BTreeMap::new(),
        })
    }

    fn from_parts(
        header: SectionHeader,
        payload: Vec<u8>,
        schema: &AttrSchema,
    ) -> Result<Self, Error> {
        let attrs = header.attrs(schema)?;
        let algorithm = match attrs.get(ATTR_ALGORITHM) {
            Some(AttrValue::Text(a))
                if SUPPORTED_ALGORITHMS.contains(&a.as_str()) =>
            {
                a.clone()
            }
            _ => return Err(Error::UnsupportedAlgorithm),
        };

        if payload.len() % core::mem::size_of::<SignatureRecord>() != 0 {
            return Err(Error::MalformedSignaturePayload);
        }
        let mut signatures = BTreeMap::new();
        for chunk in payload.chunks_exact(core::mem::size_of::<SignatureRecord>())
        {
            let rec = SignatureRecord::read_from_bytes(chunk)
                .map_err(|_| Error::MalformedSignaturePayload)?;
            // A later duplicate fingerprint overwrites an earlier one;
            // uniqueness is enforced when signatures are added, not here.
            signatures.insert(rec.fingerprint, rec.signature);
        }

        let mut section = Self { header, algorithm, signatures };
        section.refresh_payload_info();
        Ok(section)
    }

    pub fn name(&self) -> &str {
        SIGN_SECTION_NAME
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn attrs(&self, schema: &AttrSchema) -> Result<Attrs, Error> {
        self.header.attrs(schema)
    }

    pub fn signatures(&self) -> &BTreeMap<Fingerprint, CompactSignature> {
        &self.signatures
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.signatures.contains_key(fingerprint)
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Inserts (or replaces) a record after validating both lengths.
    pub fn insert(
        &mut self,
        fingerprint: &[u8],
        signature: &[u8],
    ) -> Result<(), Error> {
        let fingerprint: Fingerprint =
            fingerprint.try_into().map_err(|_| Error::InvalidRecordLength)?;
        let signature: CompactSignature =
            signature.try_into().map_err(|_| Error::InvalidRecordLength)?;
        self.signatures.insert(fingerprint, signature);
        self.refresh_payload_info();
        Ok(())
    }

    fn payload_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            self.signatures.len() * core::mem::size_of::<SignatureRecord>(),
        );
        for (fingerprint, signature) in &self.signatures {
            let rec = SignatureRecord {
                fingerprint: *fingerprint,
                signature: *signature,
            };
            out.extend_from_slice(rec.as_bytes());
        }
        out
    }

    fn refresh_payload_info(&mut self) {
        let payload = self.payload_bytes();
        self.header.set_payload_info(&payload);
        self.header.update_crc();
    }

    pub fn serialize(&self) -> Vec<u8> {
        let payload = self.payload_bytes();
        let mut out =
            Vec::with_capacity(SectionHeader::SIZE + payload.len());
        out.extend_from_slice(self.header.as_bytes());
        out.extend_from_slice(&payload);
        out
    }
}

/// A decoded section of an upgrade file.
///
/// The variant is decided exactly once, at deserialization, by comparing
/// the header name against [`SIGN_SECTION_NAME`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    Payload(PayloadSection),
    Signature(SignatureSection),
}

impl Section {
    pub fn name(&self) -> &str {
        match self {
            Section::Payload(s) => s.name(),
            Section::Signature(s) => s.name(),
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Section::Payload(s) => s.serialize(),
            Section::Signature(s) => s.serialize(),
        }
    }

    /// Reads one section starting at `offset`; returns it together with the
    /// offset of the first byte past it.
    pub fn deserialize(
        buffer: &[u8],
        offset: usize,
        schema: &AttrSchema,
    ) -> Result<(Section, usize), Error> {
        let header_end = offset
            .checked_add(SectionHeader::SIZE)
            .ok_or(Error::BufferTooShort)?;
        let header_bytes =
            buffer.get(offset..header_end).ok_or(Error::BufferTooShort)?;
        let header = SectionHeader::read_from_bytes(header_bytes)
            .map_err(|_| Error::BufferTooShort)?;
        header.validate(schema)?;

        let pl_size = header.pl_size.get() as usize;
        let payload_end =
            header_end.checked_add(pl_size).ok_or(Error::BufferTooShort)?;
        let payload = buffer
            .get(header_end..payload_end)
            .ok_or(Error::BufferTooShort)?;
        if crc32(payload) != header.pl_crc.get() {
            return Err(Error::PayloadCorrupted);
        }
        let payload = payload.to_vec();

        let section = match header.name_str() {
            Ok(SIGN_SECTION_NAME) => Section::Signature(
                SignatureSection::from_parts(header, payload, schema)?,
            ),
            _ => Section::Payload(PayloadSection::from_parts(
                header, payload,
            )?),
        };
        Ok((section, payload_end))
    }

    /// Reads a whole upgrade-file buffer into its ordered section list.
    pub fn deserialize_all(
        buffer: &[u8],
        schema: &AttrSchema,
    ) -> Result<Vec<Section>, Error> {
        let mut sections = Vec::new();
        let mut offset = 0;
        while offset < buffer.len() {
            let (section, next) =
                Section::deserialize(buffer, offset, schema)?;
            sections.push(section);
            offset = next;
        }
        Ok(sections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::{AttrDef, AttrKind, ATTR_BASE_ADDR, ATTR_PLATFORM};

    fn test_schema() -> AttrSchema {
        let mut defs = vec![
            AttrDef { name: ATTR_ALGORITHM, key: 1, kind: AttrKind::Text },
            AttrDef { name: ATTR_BASE_ADDR, key: 2, kind: AttrKind::Integer },
            AttrDef { name: ATTR_PLATFORM, key: 4, kind: AttrKind::Text },
        ];
        defs.push(AttrDef { name: "a3", key: 0xa3, kind: AttrKind::Integer });
        AttrSchema::new(defs)
    }

    fn tagged_payload() -> Vec<u8> {
        b"Something useless<version:tag10>0102213405</version:tag10>".to_vec()
    }

    #[test]
    fn header_name_round_trip() {
        let mut header = SectionHeader::new("boot").unwrap();
        assert_eq!(header.name_str().unwrap(), "boot");
        assert_eq!(
            &header.name,
            b"boot\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00"
        );
        header.set_name("123456789012345").unwrap();
        assert_eq!(header.name_str().unwrap(), "123456789012345");
        assert_eq!(
            header.set_name("1234567890123456"),
            Err(Error::NameTooLong)
        );
        // A failed rename leaves the previous name in place.
        assert_eq!(header.name_str().unwrap(), "123456789012345");
    }

    #[test]
    fn header_version_serializes_little_endian() {
        let mut header = SectionHeader::new("boot").unwrap();
        header.pl_ver.set(102213405); // 1.22.134-rc5
        assert_eq!(&header.as_bytes()[24..28], &[0x1d, 0xa7, 0x17, 0x06]);
    }

    #[test]
    fn header_crc_detects_change() {
        let mut header = SectionHeader::new("test").unwrap();
        header.update_crc();
        assert_ne!(header.struct_crc.get(), 0);
        assert!(header.check_crc());
        let crc = header.struct_crc.get();
        header.struct_crc.set(crc ^ 1);
        assert!(!header.check_crc());
    }

    #[track_caller]
    fn expect_defect(header: SectionHeader, defect: HeaderDefect) {
        let mut header = header;
        header.update_crc();
        assert_eq!(
            header.validate(&AttrSchema::default()),
            Err(Error::InvalidSection(defect))
        );
    }

    #[test]
    fn header_validation() {
        let mut header = SectionHeader::new("test").unwrap();
        header.update_crc();
        assert!(header.validate(&AttrSchema::default()).is_ok());

        let mut h = header;
        h.magic.set(12345);
        expect_defect(h, HeaderDefect::Magic);

        let mut h = header;
        h.struct_rev.set(12345);
        expect_defect(h, HeaderDefect::Revision);

        let mut h = header;
        h.name = *b"1234567890123456";
        expect_defect(h, HeaderDefect::Name);

        let mut h = header;
        h.pl_ver.set(version::VERSION_MAX + 1);
        expect_defect(h, HeaderDefect::Version);

        let mut h = header;
        h.pl_size.set(MAX_PAYLOAD_SIZE + 1);
        expect_defect(h, HeaderDefect::PayloadSize);

        let mut h = header;
        h.attr_list[0] = 1; // algorithm key with an overflowing length
        h.attr_list[1] = (ATTR_LIST_LEN - 1) as u8;
        expect_defect(h, HeaderDefect::Attributes);

        // Stale CRC itself.
        let mut h = header;
        h.pl_crc.set(h.pl_crc.get() ^ 1);
        assert_eq!(
            h.validate(&AttrSchema::default()),
            Err(Error::InvalidSection(HeaderDefect::Crc))
        );
    }

    #[test]
    fn payload_section_versions() {
        let section = PayloadSection::new("boot", tagged_payload()).unwrap();
        assert_eq!(section.version(), 102213405);
        assert_eq!(section.version_str(), "1.22.134-rc5");
        assert_eq!(section.signing_version_str().unwrap(), "1.22.134rc5");

        let twice = [tagged_payload(), tagged_payload()].concat();
        assert_eq!(
            PayloadSection::new("boot", twice),
            Err(Error::DuplicateVersionTag)
        );
    }

    #[test]
    fn payload_section_without_version() {
        let section =
            PayloadSection::new("main", b"no tag at all".to_vec()).unwrap();
        assert_eq!(section.version(), version::VERSION_NA);
        assert_eq!(section.version_str(), "");
        assert_eq!(
            section.signing_version_str(),
            Err(Error::VersionNotAvailable)
        );
    }

    #[test]
    fn sign_name_is_reserved() {
        assert_eq!(
            PayloadSection::new("sign", Vec::new()),
            Err(Error::ReservedSectionName)
        );
    }

    #[test]
    fn payload_round_trip_with_offset() {
        let schema = test_schema();
        let mut attrs = Attrs::new();
        attrs.set("a3", AttrValue::Integer(123));
        let section = PayloadSection::with_attrs(
            "boot",
            tagged_payload(),
            &attrs,
            &schema,
        )
        .unwrap();

        let dummy = b"dummy data before section";
        let mut data = dummy.to_vec();
        data.extend_from_slice(&section.serialize());

        let (decoded, offset) =
            Section::deserialize(&data, dummy.len(), &schema).unwrap();
        assert_eq!(offset, data.len());
        let Section::Payload(decoded) = decoded else {
            panic!("expected payload section");
        };
        assert_eq!(decoded.name(), section.name());
        assert_eq!(decoded.version(), section.version());
        assert_eq!(
            decoded.attrs(&schema).unwrap(),
            section.attrs(&schema).unwrap()
        );
        assert_eq!(decoded.payload(), section.payload());
        assert_eq!(decoded, section);
    }

    #[test]
    fn corrupted_header_detected() {
        let section =
            PayloadSection::new("test", b"abcdefgh".to_vec()).unwrap();
        let schema = AttrSchema::default();
        let mut data = section.serialize();
        Section::deserialize(&data, 0, &schema).unwrap();
        data[100] ^= 1;
        assert!(Section::deserialize(&data, 0, &schema).is_err());
    }

    #[test]
    fn corrupted_payload_detected() {
        let section =
            PayloadSection::new("test", b"abcdefgh".to_vec()).unwrap();
        let schema = AttrSchema::default();
        let mut data = section.serialize();
        Section::deserialize(&data, 0, &schema).unwrap();
        data[SectionHeader::SIZE + 3] ^= 1;
        assert_eq!(
            Section::deserialize(&data, 0, &schema),
            Err(Error::PayloadCorrupted)
        );
    }

    #[test]
    fn truncated_buffers_detected() {
        let section =
            PayloadSection::new("test", b"abcdefgh".to_vec()).unwrap();
        let schema = AttrSchema::default();
        let data = section.serialize();
        assert_eq!(
            Section::deserialize(&data[..100], 0, &schema),
            Err(Error::BufferTooShort)
        );
        // Full header present but payload cut short.
        assert_eq!(
            Section::deserialize(&data[..data.len() - 1], 0, &schema),
            Err(Error::BufferTooShort)
        );
    }

    #[test]
    fn every_header_bit_is_covered_by_crc() {
        let section =
            PayloadSection::new("test", b"abcdefgh".to_vec()).unwrap();
        let schema = AttrSchema::default();
        let reference = section.serialize();
        for byte in 0..SectionHeader::SIZE {
            let mut data = reference.clone();
            data[byte] ^= 1;
            assert!(
                Section::deserialize(&data, 0, &schema).is_err(),
                "flip at header byte {byte} went undetected"
            );
        }
    }

    #[test]
    fn signature_section_creation() {
        let section = SignatureSection::new(DSA_SECP256K1_SHA256).unwrap();
        assert_eq!(section.name(), "sign");
        assert_eq!(section.algorithm(), DSA_SECP256K1_SHA256);
        assert!(section.is_empty());
        let attrs = section.attrs(&AttrSchema::default()).unwrap();
        assert_eq!(
            attrs.get(ATTR_ALGORITHM),
            Some(&AttrValue::Text(DSA_SECP256K1_SHA256.to_string()))
        );

        assert_eq!(
            SignatureSection::new("unsupported-algorithm"),
            Err(Error::UnsupportedAlgorithm)
        );
    }

    #[test]
    fn signature_record_lengths_validated() {
        let mut section = SignatureSection::new(DSA_SECP256K1_SHA256).unwrap();
        section.insert(&[b'a'; 16], &[b'1'; 64]).unwrap();
        assert_eq!(
            section.insert(&[b'a'; 17], &[b'1'; 64]),
            Err(Error::InvalidRecordLength)
        );
        assert_eq!(
            section.insert(&[b'a'; 15], &[b'1'; 64]),
            Err(Error::InvalidRecordLength)
        );
        assert_eq!(
            section.insert(&[b'a'; 16], &[b'1'; 63]),
            Err(Error::InvalidRecordLength)
        );
        assert_eq!(
            section.insert(&[b'a'; 16], &[b'1'; 65]),
            Err(Error::InvalidRecordLength)
        );
    }

    #[test]
    fn signature_round_trip() {
        let schema = AttrSchema::default();
        let mut section = SignatureSection::new(DSA_SECP256K1_SHA256).unwrap();
        section.insert(&[b'a'; 16], &[b'1'; 64]).unwrap();
        section.insert(&[b'b'; 16], &[b'2'; 64]).unwrap();
        section.insert(&[b'c'; 16], &[b'3'; 64]).unwrap();

        let dummy = b"dummy data before section";
        let serialized = section.serialize();
        let mut data = dummy.to_vec();
        data.extend_from_slice(&serialized);
        data.extend_from_slice(b"dummy data at the end");

        let (decoded, offset) =
            Section::deserialize(&data, dummy.len(), &schema).unwrap();
        assert_eq!(offset, dummy.len() + serialized.len());
        let Section::Signature(decoded) = decoded else {
            panic!("expected signature section");
        };
        assert_eq!(decoded.name(), section.name());
        assert_eq!(decoded.signatures(), section.signatures());
        assert_eq!(decoded, section);
    }

    #[test]
    fn signature_payload_must_be_record_multiple() {
        let section = SignatureSection::new(DSA_SECP256K1_SHA256).unwrap();
        let mut data = section.serialize();
        // Append a truncated record and fix up the header by hand.
        data.extend_from_slice(&[0u8; 40]);
        let mut header =
            SectionHeader::read_from_bytes(&data[..SectionHeader::SIZE])
                .unwrap();
        header.set_payload_info(&data[SectionHeader::SIZE..]);
        header.update_crc();
        data[..SectionHeader::SIZE].copy_from_slice(header.as_bytes());

        assert_eq!(
            Section::deserialize(&data, 0, &AttrSchema::default()),
            Err(Error::MalformedSignaturePayload)
        );
    }

    #[test]
    fn deserialize_all_walks_every_section() {
        let schema = AttrSchema::default();
        let payload = PayloadSection::new("boot", tagged_payload()).unwrap();
        let mut signature =
            SignatureSection::new(DSA_SECP256K1_SHA256).unwrap();
        signature.insert(&[b'a'; 16], &[b'1'; 64]).unwrap();

        let mut data = payload.serialize();
        data.extend_from_slice(&signature.serialize());

        let sections = Section::deserialize_all(&data, &schema).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0], Section::Payload(payload));
        assert_eq!(sections[1], Section::Signature(signature));
    }
}
