//! Stored fields: a compact per-document record of field values.
//!
//! Record layout (little-endian):
//!
//! ```text
//! u16 field_count
//! repeat field_count times:
//!     u16 name_len, name bytes
//!     u8  tag           (0 = bytes, 1 = long, 2 = int, 3 = double)
//!     value             (u32 len + bytes | i64 | i32 | f64)
//! ```
//!
//! A field with several values is written once per value, in insertion order.
//! The document source is kept under the reserved [`SOURCE_FIELD`] name.

use std::{
    collections::BTreeSet,
    io::{Cursor, Read},
};

use ahash::AHashMap;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use strata_common::{Result, error::Error, verify_arg, verify_data};

/// The reserved stored field holding the document source.
pub const SOURCE_FIELD: &str = "_source";

/// The metadata field holding the document id.
pub const ID_FIELD: &str = "_id";

const TAG_BYTES: u8 = 0;
const TAG_LONG: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_DOUBLE: u8 = 3;

/// What a reader needs from the stored fields of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredFieldsSpec {
    pub requires_source: bool,
    pub fields: BTreeSet<String>,
}

impl StoredFieldsSpec {
    pub const NO_REQUIREMENTS: StoredFieldsSpec = StoredFieldsSpec {
        requires_source: false,
        fields: BTreeSet::new(),
    };

    pub const NEEDS_SOURCE: StoredFieldsSpec = StoredFieldsSpec {
        requires_source: true,
        fields: BTreeSet::new(),
    };

    pub fn fields<I, S>(fields: I) -> StoredFieldsSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StoredFieldsSpec {
            requires_source: false,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.requires_source && self.fields.is_empty()
    }

    /// Combines two specs into one that satisfies both.
    pub fn merge(&self, other: &StoredFieldsSpec) -> StoredFieldsSpec {
        StoredFieldsSpec {
            requires_source: self.requires_source || other.requires_source,
            fields: self.fields.union(&other.fields).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Bytes(Vec<u8>),
    Long(i64),
    Int(i32),
    Double(f64),
}

/// The requested stored fields of one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredDocument {
    pub fields: AHashMap<String, Vec<StoredValue>>,
    /// The raw source bytes, when requested and present.
    pub source: Option<Vec<u8>>,
}

impl StoredDocument {
    /// The values of `field`, in insertion order; empty when absent.
    pub fn values(&self, field: &str) -> &[StoredValue] {
        self.fields.get(field).map_or(&[], Vec::as_slice)
    }
}

/// Random access to the stored fields of a segment.
pub trait StoredFieldsReader: Send {
    /// Loads the fields of `doc` selected by `spec`.
    fn document(&mut self, doc: u32, spec: &StoredFieldsSpec) -> Result<StoredDocument>;
}

/// Encodes a stored record from `(field, value)` pairs.
pub fn encode_record<'a>(
    fields: impl IntoIterator<Item = (&'a str, &'a StoredValue)>,
) -> Result<Vec<u8>> {
    let fields = fields.into_iter().collect::<Vec<_>>();
    verify_arg!(fields, fields.len() <= u16::MAX as usize);
    let mut buf = Vec::new();
    buf.write_u16::<LittleEndian>(fields.len() as u16)?;
    for (name, value) in fields {
        verify_arg!(name, name.len() <= u16::MAX as usize);
        buf.write_u16::<LittleEndian>(name.len() as u16)?;
        buf.extend_from_slice(name.as_bytes());
        match value {
            StoredValue::Bytes(bytes) => {
                verify_arg!(bytes, bytes.len() <= u32::MAX as usize);
                buf.write_u8(TAG_BYTES)?;
                buf.write_u32::<LittleEndian>(bytes.len() as u32)?;
                buf.extend_from_slice(bytes);
            }
            StoredValue::Long(v) => {
                buf.write_u8(TAG_LONG)?;
                buf.write_i64::<LittleEndian>(*v)?;
            }
            StoredValue::Int(v) => {
                buf.write_u8(TAG_INT)?;
                buf.write_i32::<LittleEndian>(*v)?;
            }
            StoredValue::Double(v) => {
                buf.write_u8(TAG_DOUBLE)?;
                buf.write_f64::<LittleEndian>(*v)?;
            }
        }
    }
    Ok(buf)
}

/// Decodes the fields of a stored record selected by `spec`, skipping the rest.
pub fn decode_record(record: &[u8], spec: &StoredFieldsSpec) -> Result<StoredDocument> {
    let mut doc = StoredDocument::default();
    if spec.is_empty() {
        return Ok(doc);
    }
    let mut cursor = Cursor::new(record);
    let field_count = cursor.read_u16::<LittleEndian>().map_err(malformed)?;
    for _ in 0..field_count {
        let name_len = cursor.read_u16::<LittleEndian>().map_err(malformed)? as usize;
        let mut name = vec![0u8; name_len];
        cursor.read_exact(&mut name).map_err(malformed)?;
        let name = String::from_utf8(name)
            .map_err(|_| Error::invalid_format_msg("stored fields", "field name is not utf-8"))?;
        let tag = cursor.read_u8().map_err(malformed)?;
        let value = match tag {
            TAG_BYTES => {
                let len = cursor.read_u32::<LittleEndian>().map_err(malformed)? as usize;
                let remaining = record.len() - cursor.position() as usize;
                verify_data!(len, len <= remaining);
                let mut bytes = vec![0u8; len];
                cursor.read_exact(&mut bytes).map_err(malformed)?;
                StoredValue::Bytes(bytes)
            }
            TAG_LONG => StoredValue::Long(cursor.read_i64::<LittleEndian>().map_err(malformed)?),
            TAG_INT => StoredValue::Int(cursor.read_i32::<LittleEndian>().map_err(malformed)?),
            TAG_DOUBLE => {
                StoredValue::Double(cursor.read_f64::<LittleEndian>().map_err(malformed)?)
            }
            other => {
                return Err(Error::invalid_format_msg(
                    "stored fields",
                    format!("unknown value tag {other}"),
                ));
            }
        };

        if name == SOURCE_FIELD {
            if spec.requires_source {
                let StoredValue::Bytes(bytes) = value else {
                    return Err(Error::invalid_format_msg(
                        "stored fields",
                        "source is not stored as bytes",
                    ));
                };
                doc.source = Some(bytes);
            }
        } else if spec.fields.contains(&name) {
            doc.fields.entry(name).or_default().push(value);
        }
    }
    verify_data!(record, cursor.position() as usize == record.len());
    Ok(doc)
}

fn malformed(e: std::io::Error) -> Error {
    Error::invalid_format_msg("stored fields", e.to_string())
}
