// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! TLV attribute list stored in the section header.
//!
//! Attributes are `(key, len, value...)` triples packed into the fixed
//! 216-byte `attr_list` field, terminated by a zero key byte or array
//! exhaustion. Which key bytes exist and how their values are typed is
//! described by an [`AttrSchema`] passed into the codec; production code
//! uses [`AttrSchema::default`], tests may construct their own.
//!
//! Unknown key bytes encountered on decode are skipped, not rejected: new
//! attributes never break old readers.

use crate::error::Error;

/// Size of the `attr_list` array in the section header.
pub const ATTR_LIST_LEN: usize = 216;
/// Maximum encoded size of a text attribute value.
pub const ATTR_TEXT_MAX: usize = 32;

/// Signing algorithm identifier (text).
pub const ATTR_ALGORITHM: &str = "algorithm";
/// Load address of the payload in device memory (integer).
pub const ATTR_BASE_ADDR: &str = "base_addr";
/// Entry point address (integer).
pub const ATTR_ENTRY_POINT: &str = "entry_point";
/// Target platform identifier, e.g. `stm32f469disco` (text).
pub const ATTR_PLATFORM: &str = "platform";

/// Declared value type of an attribute key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    /// Unsigned integer, minimal-length little-endian encoding.
    Integer,
    /// ASCII text, at most [`ATTR_TEXT_MAX`] bytes.
    Text,
    /// Marker attribute carrying no value.
    Opaque,
}

/// One row of an attribute schema.
#[derive(Debug, Clone, Copy)]
pub struct AttrDef {
    pub name: &'static str,
    pub key: u8,
    pub kind: AttrKind,
}

/// The set of attribute keys a codec knows about.
#[derive(Debug, Clone)]
pub struct AttrSchema {
    defs: Vec<AttrDef>,
}

const DEFAULT_DEFS: &[AttrDef] = &[
    AttrDef { name: ATTR_ALGORITHM, key: 1, kind: AttrKind::Text },
    AttrDef { name: ATTR_BASE_ADDR, key: 2, kind: AttrKind::Integer },
    AttrDef { name: ATTR_ENTRY_POINT, key: 3, kind: AttrKind::Integer },
    AttrDef { name: ATTR_PLATFORM, key: 4, kind: AttrKind::Text },
];

impl Default for AttrSchema {
    fn default() -> Self {
        Self { defs: DEFAULT_DEFS.to_vec() }
    }
}

impl AttrSchema {
    pub fn new(defs: Vec<AttrDef>) -> Self {
        Self { defs }
    }

    fn by_name(&self, name: &str) -> Option<&AttrDef> {
        self.defs.iter().find(|d| d.name == name)
    }

    fn by_key(&self, key: u8) -> Option<&AttrDef> {
        self.defs.iter().find(|d| d.key == key)
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Integer(u64),
    Text(String),
    Opaque,
}

impl AttrValue {
    fn kind(&self) -> AttrKind {
        match self {
            AttrValue::Integer(_) => AttrKind::Integer,
            AttrValue::Text(_) => AttrKind::Text,
            AttrValue::Opaque => AttrKind::Opaque,
        }
    }
}

/// An ordered name → value mapping; encode emits entries in insertion
/// order, which makes the serialized list (and everything CRC'd over it)
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attrs {
    entries: Vec<(&'static str, AttrValue)>,
}

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute, replacing any existing value in place.
    pub fn set(&mut self, name: &'static str, value: AttrValue) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &AttrValue)> {
        self.entries.iter().map(|(n, v)| (*n, v))
    }

    /// Encodes the attributes into a fixed-size TLV list.
    pub fn encode(&self, schema: &AttrSchema) -> Result<[u8; ATTR_LIST_LEN], Error> {
        let mut out = [0u8; ATTR_LIST_LEN];
        let mut at = 0;

        for (name, value) in self.iter() {
            let def = schema.by_name(name).ok_or(Error::UnknownAttribute)?;
            if value.kind() != def.kind {
                return Err(Error::TypeMismatch);
            }

            let data: Vec<u8> = match value {
                AttrValue::Integer(v) => int_to_min_le(*v),
                AttrValue::Text(s) => {
                    if !s.is_ascii() {
                        return Err(Error::TypeMismatch);
                    }
                    if s.len() > ATTR_TEXT_MAX {
                        return Err(Error::AttributeTooLarge);
                    }
                    s.as_bytes().to_vec()
                }
                AttrValue::Opaque => Vec::new(),
            };
            if data.len() > u8::MAX as usize {
                return Err(Error::AttributeTooLarge);
            }
            if at + 2 + data.len() > ATTR_LIST_LEN {
                return Err(Error::AttributeTooLarge);
            }

            out[at] = def.key;
            out[at + 1] = data.len() as u8;
            out[at + 2..at + 2 + data.len()].copy_from_slice(&data);
            at += 2 + data.len();
        }

        Ok(out)
    }

    /// Decodes a TLV list, skipping unrecognized key bytes.
    pub fn decode(list: &[u8; ATTR_LIST_LEN], schema: &AttrSchema) -> Result<Attrs, Error> {
        let mut attrs = Attrs::new();
        let mut at = 0;

        while at < ATTR_LIST_LEN {
            let key = list[at];
            if key == 0 {
                break;
            }
            if at + 1 >= ATTR_LIST_LEN {
                return Err(Error::AttributeOverflow);
            }
            let len = list[at + 1] as usize;
            if len > ATTR_LIST_LEN - at - 2 {
                return Err(Error::AttributeOverflow);
            }
            let data = &list[at + 2..at + 2 + len];
            at += 2 + len;

            let Some(def) = schema.by_key(key) else {
                continue; // unknown attribute, skip it
            };
            let value = match def.kind {
                AttrKind::Integer => AttrValue::Integer(int_from_min_le(data)?),
                AttrKind::Text => {
                    let s = core::str::from_utf8(data)
                        .map_err(|_| Error::TypeMismatch)?;
                    if !s.is_ascii() {
                        return Err(Error::TypeMismatch);
                    }
                    AttrValue::Text(s.to_string())
                }
                AttrKind::Opaque => AttrValue::Opaque,
            };
            attrs.set(def.name, value);
        }

        Ok(attrs)
    }
}

/// Minimal-length little-endian integer encoding; zero encodes to zero
/// bytes.
fn int_to_min_le(v: u64) -> Vec<u8> {
    let len = (u64::BITS - v.leading_zeros()).div_ceil(8) as usize;
    v.to_le_bytes()[..len].to_vec()
}

fn int_from_min_le(data: &[u8]) -> Result<u64, Error> {
    if data.len() > core::mem::size_of::<u64>() {
        return Err(Error::AttributeTooLarge);
    }
    let mut bytes = [0u8; 8];
    bytes[..data.len()].copy_from_slice(data);
    Ok(u64::from_le_bytes(bytes))
}
