//! Loaders reading stored fields. These only work row by row.

use std::{fmt, sync::Arc};

use strata_block::{builder::BlockBuilder, element_type::ElementType};
use strata_common::{Result, error::Error};
use strata_segment::{
    segment::SegmentReader,
    stored::{ID_FIELD, StoredFieldsSpec, StoredValue},
};

use crate::{
    block_loader::{BlockLoader, ColumnAtATimeReader, RowStrideReader},
    stored_field_loader::StoredFieldLoader,
};

/// Loads the stored byte values of a field.
#[derive(Debug, Clone)]
pub struct BytesStoredFieldsLoader {
    field: String,
}

impl BytesStoredFieldsLoader {
    pub fn new(field: impl Into<String>) -> BytesStoredFieldsLoader {
        BytesStoredFieldsLoader {
            field: field.into(),
        }
    }
}

impl BlockLoader for BytesStoredFieldsLoader {
    fn element_type(&self) -> ElementType {
        ElementType::Bytes
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
        Ok(Box::new(StoredBytesReader {
            field: self.field.clone(),
            name: "StoredFields.Bytes",
        }))
    }

    fn row_stride_stored_fields_spec(&self) -> StoredFieldsSpec {
        StoredFieldsSpec::fields([self.field.as_str()])
    }
}

/// Loads the `_id` of each document.
#[derive(Debug, Clone, Default)]
pub struct IdStoredFieldsLoader;

impl BlockLoader for IdStoredFieldsLoader {
    fn element_type(&self) -> ElementType {
        ElementType::Bytes
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
        Ok(Box::new(StoredBytesReader {
            field: ID_FIELD.to_string(),
            name: "StoredFields.Id",
        }))
    }

    fn row_stride_stored_fields_spec(&self) -> StoredFieldsSpec {
        StoredFieldsSpec::fields([ID_FIELD])
    }
}

struct StoredBytesReader {
    field: String,
    name: &'static str,
}

impl RowStrideReader for StoredBytesReader {
    fn read(
        &mut self,
        _doc: u32,
        stored: &StoredFieldLoader,
        builder: &mut BlockBuilder,
    ) -> Result<()> {
        let values = stored.values(&self.field);
        match values {
            [] => builder.append_null(),
            [value] => builder.append_bytes(self.as_bytes(value)?),
            _ => {
                builder.begin_position_entry();
                for value in values {
                    builder.append_bytes(self.as_bytes(value)?);
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

impl StoredBytesReader {
    fn as_bytes<'a>(&self, value: &'a StoredValue) -> Result<&'a [u8]> {
        match value {
            StoredValue::Bytes(bytes) => Ok(bytes.as_slice()),
            other => Err(Error::invalid_format_msg(
                self.field.as_str(),
                format!("expected a stored byte string, found {other:?}"),
            )),
        }
    }
}

impl fmt::Display for StoredBytesReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
