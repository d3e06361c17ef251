//! Loaders extracting values from the document source.
//!
//! The slowest way to load a field, used for fields without doc values or
//! stored copies. Values come out in the order they appear in the source.

use std::{fmt, sync::Arc};

use serde_json::Value as JsonValue;
use strata_block::{builder::BlockBuilder, element_type::ElementType};
use strata_common::{Result, error::Error};
use strata_segment::{segment::SegmentReader, stored::StoredFieldsSpec};
use strata_value_conversions as conv;

use crate::{
    block_loader::{BlockLoader, ColumnAtATimeReader, RowStrideReader},
    stored_field_loader::StoredFieldLoader,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Longs,
    Ints,
    Doubles,
    Booleans,
    Bytes,
}

impl SourceKind {
    pub fn element_type(&self) -> ElementType {
        match self {
            SourceKind::Longs => ElementType::Long,
            SourceKind::Ints => ElementType::Int,
            SourceKind::Doubles => ElementType::Double,
            SourceKind::Booleans => ElementType::Boolean,
            SourceKind::Bytes => ElementType::Bytes,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            SourceKind::Longs => "Longs",
            SourceKind::Ints => "Ints",
            SourceKind::Doubles => "Doubles",
            SourceKind::Booleans => "Booleans",
            SourceKind::Bytes => "Bytes",
        }
    }
}

/// Loads a field by parsing the source of each document.
#[derive(Debug, Clone)]
pub struct SourceBlockLoader {
    field: String,
    kind: SourceKind,
}

impl SourceBlockLoader {
    pub fn new(field: impl Into<String>, kind: SourceKind) -> SourceBlockLoader {
        SourceBlockLoader {
            field: field.into(),
            kind,
        }
    }
}

impl BlockLoader for SourceBlockLoader {
    fn element_type(&self) -> ElementType {
        self.kind.element_type()
    }

    fn column_at_a_time_reader(
        &self,
        _segment: &Arc<dyn SegmentReader>,
    ) -> Result<Option<Box<dyn ColumnAtATimeReader>>> {
        Ok(None)
    }

    fn row_stride_reader(
        &self,
        _segment: &Arc<dyn SegmentReader>,
    ) -> Result<Box<dyn RowStrideReader>> {
        Ok(Box::new(SourceReader {
            field: self.field.clone(),
            kind: self.kind,
        }))
    }

    fn row_stride_stored_fields_spec(&self) -> StoredFieldsSpec {
        StoredFieldsSpec::NEEDS_SOURCE
    }
}

struct SourceReader {
    field: String,
    kind: SourceKind,
}

impl SourceReader {
    fn append(&self, value: &JsonValue, builder: &mut BlockBuilder) -> Result<()> {
        let target = self.kind.element_type().name();
        let mismatch = || Error::value_conversion(value.to_string(), target);
        match (self.kind, value) {
            (SourceKind::Bytes, JsonValue::String(s)) => builder.append_bytes(s.as_bytes()),
            (SourceKind::Bytes, JsonValue::Number(n)) => {
                let text = match n.as_i64() {
                    Some(v) => conv::long_to_text(v),
                    None => conv::double_to_text(n.as_f64().ok_or_else(mismatch)?),
                };
                builder.append_bytes(text.as_bytes());
            }
            (SourceKind::Bytes, JsonValue::Bool(b)) => {
                builder.append_bytes(conv::boolean_to_text(*b).as_bytes())
            }
            (SourceKind::Longs, JsonValue::Number(n)) => builder.append_long(match n.as_i64() {
                Some(v) => v,
                None => conv::text_to_long(n.to_string().as_bytes())?,
            }),
            (SourceKind::Longs, JsonValue::String(s)) => {
                builder.append_long(conv::text_to_long(s.as_bytes())?)
            }
            (SourceKind::Ints, JsonValue::Number(n)) => {
                builder.append_int(conv::text_to_int(n.to_string().as_bytes())?)
            }
            (SourceKind::Ints, JsonValue::String(s)) => {
                builder.append_int(conv::text_to_int(s.as_bytes())?)
            }
            (SourceKind::Doubles, JsonValue::Number(n)) => {
                builder.append_double(n.as_f64().ok_or_else(mismatch)?)
            }
            (SourceKind::Doubles, JsonValue::String(s)) => {
                builder.append_double(conv::text_to_double(s.as_bytes())?)
            }
            (SourceKind::Booleans, JsonValue::Bool(b)) => builder.append_boolean(*b),
            (SourceKind::Booleans, JsonValue::String(s)) => {
                builder.append_boolean(conv::text_to_boolean(s.as_bytes())?)
            }
            (_, JsonValue::Object(_)) => {
                return Err(Error::invalid_format_msg(
                    self.field.as_str(),
                    "expected a leaf value, found an object",
                ));
            }
            _ => return Err(mismatch()),
        }
        Ok(())
    }
}

impl RowStrideReader for SourceReader {
    fn read(
        &mut self,
        _doc: u32,
        stored: &StoredFieldLoader,
        builder: &mut BlockBuilder,
    ) -> Result<()> {
        let source = stored.source()?;
        let values = source
            .extract_values(&self.field)
            .into_iter()
            .filter(|v| !v.is_null())
            .collect::<Vec<_>>();
        match values.as_slice() {
            [] => builder.append_null(),
            [value] => self.append(value, builder)?,
            _ => {
                builder.begin_position_entry();
                for value in &values {
                    self.append(value, builder)?;
                }
                builder.end_position_entry();
            }
        }
        Ok(())
    }

    fn can_reuse(&self, _starting_doc: u32) -> bool {
        true
    }
}

impl fmt::Display for SourceReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Source.{}", self.kind.name())
    }
}
