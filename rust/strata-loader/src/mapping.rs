//! Field mappings and the choice of loader for a mapped field.

use std::{fmt, sync::Arc};

use strata_block::element_type::ElementType;
use strata_common::{Result, error::Error};
use strata_segment::stored::ID_FIELD;

use crate::{
    block_loader::BlockLoader,
    doc_values::{BytesDocValuesLoader, NumericDocValuesLoader, NumericKind},
    source::{SourceBlockLoader, SourceKind},
    stored_fields::{BytesStoredFieldsLoader, IdStoredFieldsLoader},
};

/// The indexed type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Long,
    Integer,
    Short,
    Byte,
    Double,
    Boolean,
    Keyword,
    Text,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Long => "long",
            DataType::Integer => "integer",
            DataType::Short => "short",
            DataType::Byte => "byte",
            DataType::Double => "double",
            DataType::Boolean => "boolean",
            DataType::Keyword => "keyword",
            DataType::Text => "text",
        }
    }

    pub fn from_name(name: &str) -> Result<DataType> {
        Ok(match name {
            "long" => DataType::Long,
            "integer" => DataType::Integer,
            "short" => DataType::Short,
            "byte" => DataType::Byte,
            "double" => DataType::Double,
            "boolean" => DataType::Boolean,
            "keyword" => DataType::Keyword,
            "text" => DataType::Text,
            _ => return Err(Error::invalid_arg("data_type", format!("unknown type [{name}]"))),
        })
    }

    /// The block type values of this data type load as. Small integers widen
    /// to `Int`.
    pub fn element_type(&self) -> ElementType {
        match self {
            DataType::Long => ElementType::Long,
            DataType::Integer | DataType::Short | DataType::Byte => ElementType::Int,
            DataType::Double => ElementType::Double,
            DataType::Boolean => ElementType::Boolean,
            DataType::Keyword | DataType::Text => ElementType::Bytes,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A field as mapped in one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedField {
    pub name: String,
    pub data_type: DataType,
    pub doc_values: bool,
    pub stored: bool,
}

impl MappedField {
    pub fn new(name: impl Into<String>, data_type: DataType) -> MappedField {
        MappedField {
            name: name.into(),
            data_type,
            doc_values: data_type != DataType::Text,
            stored: false,
        }
    }

    pub fn with_doc_values(mut self, doc_values: bool) -> MappedField {
        self.doc_values = doc_values;
        self
    }

    pub fn with_stored(mut self, stored: bool) -> MappedField {
        self.stored = stored;
        self
    }

    /// Picks the cheapest loader for this field: doc values first, then a
    /// stored copy, then the source.
    pub fn block_loader(&self) -> Arc<dyn BlockLoader> {
        if self.name == ID_FIELD {
            return Arc::new(IdStoredFieldsLoader);
        }
        let element_type = self.data_type.element_type();
        if self.doc_values && self.data_type != DataType::Text {
            return match element_type {
                ElementType::Bytes => Arc::new(BytesDocValuesLoader::new(&self.name)),
                other => Arc::new(NumericDocValuesLoader::new(&self.name, numeric_kind(other))),
            };
        }
        if self.stored && element_type == ElementType::Bytes {
            return Arc::new(BytesStoredFieldsLoader::new(&self.name));
        }
        log::trace!("field [{}] has no columnar copy, loading from source", self.name);
        Arc::new(SourceBlockLoader::new(&self.name, source_kind(element_type)))
    }
}

fn numeric_kind(element_type: ElementType) -> NumericKind {
    match element_type {
        ElementType::Int => NumericKind::Int,
        ElementType::Double => NumericKind::Double,
        ElementType::Boolean => NumericKind::Boolean,
        _ => NumericKind::Long,
    }
}

fn source_kind(element_type: ElementType) -> SourceKind {
    match element_type {
        ElementType::Long => SourceKind::Longs,
        ElementType::Int => SourceKind::Ints,
        ElementType::Double => SourceKind::Doubles,
        ElementType::Boolean => SourceKind::Booleans,
        _ => SourceKind::Bytes,
    }
}
