//! Type coercion of loader output.
//!
//! Used when the same field is mapped with different types across shards and
//! the query asks for one common type.

use std::{fmt, sync::Arc};

use strata_block::{
    block::Block,
    builder::BlockBuilder,
    element_type::{ElementType, MvOrdering},
    values::Value,
};
use strata_common::{Result, error::Error};
use strata_segment::{segment::SegmentReader, stored::StoredFieldsSpec};
use strata_value_conversions as conv;

use crate::block_loader::{BlockLoader, ColumnAtATimeReader, RowStrideReader};

/// Converts whole blocks from one element type to another, keeping their
/// position structure: null positions stay null and every position keeps its
/// value count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockConverter {
    from: ElementType,
    to: ElementType,
}

impl BlockConverter {
    /// Creates a converter, failing with `UnsupportedConversion` when there is
    /// no value-level conversion between the two types.
    pub fn new(from: ElementType, to: ElementType) -> Result<BlockConverter> {
        use ElementType::*;
        let supported = matches!(
            (from, to),
            (Long | Int | Double | Boolean, Bytes)
                | (Bytes, Long | Int | Double | Boolean)
                | (Int, Long | Double)
                | (Long, Double)
        );
        if !supported {
            return Err(Error::unsupported_conversion(from.name(), to.name()));
        }
        Ok(BlockConverter { from, to })
    }

    pub fn source_type(&self) -> ElementType {
        self.from
    }

    pub fn target_type(&self) -> ElementType {
        self.to
    }

    /// Converts `block`, which must be of the source type or all-null.
    pub fn convert(&self, block: &Block) -> Result<Block> {
        let positions = block.position_count();
        if block.element_type() == ElementType::Null || block.are_all_values_null() {
            return Ok(Block::constant_nulls(self.to, positions));
        }
        assert_eq!(
            block.element_type(),
            self.from,
            "converter from {} applied to a {} block",
            self.from,
            block.element_type()
        );

        let mut builder = BlockBuilder::with_capacity(self.to, positions);
        for position in 0..positions {
            match block.value_count(position) {
                0 => builder.append_null(),
                1 => self.convert_value(block.value(block.first_value_index(position)), &mut builder)?,
                _ => {
                    builder.begin_position_entry();
                    for index in block.value_range(position) {
                        self.convert_value(block.value(index), &mut builder)?;
                    }
                    builder.end_position_entry();
                }
            }
        }
        builder.mv_ordering(self.converted_ordering(block.mv_ordering()));
        Ok(builder.build())
    }

    /// Widening keeps the order of values. Long to double may map distinct
    /// longs onto the same double, so uniqueness is lost. Text conversions
    /// change the order entirely.
    fn converted_ordering(&self, ordering: MvOrdering) -> MvOrdering {
        match (self.from, self.to) {
            (ElementType::Int, ElementType::Long | ElementType::Double) => ordering,
            (ElementType::Long, ElementType::Double) => match ordering {
                MvOrdering::DeduplicatedAndSortedAscending => MvOrdering::SortedAscending,
                other => other,
            },
            _ => MvOrdering::Unordered,
        }
    }

    fn convert_value(&self, value: Value<'_>, builder: &mut BlockBuilder) -> Result<()> {
        match (value, self.to) {
            (Value::Long(v), ElementType::Bytes) => {
                builder.append_bytes(conv::long_to_text(v).as_bytes())
            }
            (Value::Int(v), ElementType::Bytes) => {
                builder.append_bytes(conv::int_to_text(v).as_bytes())
            }
            (Value::Double(v), ElementType::Bytes) => {
                builder.append_bytes(conv::double_to_text(v).as_bytes())
            }
            (Value::Boolean(v), ElementType::Bytes) => {
                builder.append_bytes(conv::boolean_to_text(v).as_bytes())
            }
            (Value::Bytes(v), ElementType::Long) => builder.append_long(conv::text_to_long(v)?),
            (Value::Bytes(v), ElementType::Int) => builder.append_int(conv::text_to_int(v)?),
            (Value::Bytes(v), ElementType::Double) => {
                builder.append_double(conv::text_to_double(v)?)
            }
            (Value::Bytes(v), ElementType::Boolean) => {
                builder.append_boolean(conv::text_to_boolean(v)?)
            }
            (Value::Int(v), ElementType::Long) => builder.append_long(conv::int_to_long(v)),
            (Value::Int(v), ElementType::Double) => builder.append_double(conv::int_to_double(v)),
            (Value::Long(v), ElementType::Double) => {
                builder.append_double(conv::long_to_double(v))
            }
            (value, to) => {
                return Err(Error::unsupported_conversion(
                    value.element_type().name(),
                    to.name(),
                ));
            }
        }
        Ok(())
    }
}

/// Wraps a loader and converts everything it produces to another type.
///
/// Column readers convert each block they read. Row-stride readers are the
/// wrapped loader's own, appending unconverted values; the conversion is
/// applied once to the built block by [`BlockLoader::finish_row_stride`].
#[derive(Debug)]
pub struct TypeConvertingBlockLoader {
    inner: Arc<dyn BlockLoader>,
    converter: BlockConverter,
}

impl TypeConvertingBlockLoader {
    pub fn new(inner: Arc<dyn BlockLoader>, to: ElementType) -> Result<TypeConvertingBlockLoader> {
        let converter = BlockConverter::new(inner.element_type(), to)?;
        Ok(TypeConvertingBlockLoader { inner, converter })
    }

    pub fn inner(&self) -> &Arc<dyn BlockLoader> {
        &self.inner
    }
}

impl BlockLoader for TypeConvertingBlockLoader {
    fn element_type(&self) -> ElementType {
        self.converter.target_type()
    }

    fn column_at_a_time_reader(
        &self,
        segment: &Arc<dyn SegmentReader>,
    ) -> Result<Option<Box<dyn ColumnAtATimeReader>>> {
        Ok(self
            .inner
            .column_at_a_time_reader(segment)?
            .map(|inner| -> Box<dyn ColumnAtATimeReader> {
                Box::new(TypeConvertingReader {
                    inner,
                    converter: self.converter,
                })
            }))
    }

    fn row_stride_reader(
        &self,
        segment: &Arc<dyn SegmentReader>,
    ) -> Result<Box<dyn RowStrideReader>> {
        self.inner.row_stride_reader(segment)
    }

    fn row_stride_stored_fields_spec(&self) -> StoredFieldsSpec {
        self.inner.row_stride_stored_fields_spec()
    }

    fn row_stride_ordering(&self) -> MvOrdering {
        self.inner.row_stride_ordering()
    }

    fn row_stride_conversion(&self) -> Option<&BlockConverter> {
        Some(&self.converter)
    }
}

struct TypeConvertingReader {
    inner: Box<dyn ColumnAtATimeReader>,
    converter: BlockConverter,
}

impl ColumnAtATimeReader for TypeConvertingReader {
    fn read(&mut self, docs: &[u32]) -> Result<Block> {
        let block = self.inner.read(docs)?;
        self.converter.convert(&block)
    }

    fn can_reuse(&self, starting_doc: u32) -> bool {
        self.inner.can_reuse(starting_doc)
    }
}

impl fmt::Display for TypeConvertingReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeConverting[{}]", self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::error::ErrorKind;
    use strata_segment::memory::SegmentBuilder;

    use crate::{
        doc_values::{NumericDocValuesLoader, NumericKind},
        stored_field_loader::StoredFieldLoader,
    };

    #[test]
    fn test_unsupported_pairs() {
        for (from, to) in [
            (ElementType::Long, ElementType::Int),
            (ElementType::Double, ElementType::Long),
            (ElementType::Long, ElementType::Long),
            (ElementType::Doc, ElementType::Bytes),
        ] {
            let err = BlockConverter::new(from, to).unwrap_err();
            assert!(matches!(err.kind(), ErrorKind::UnsupportedConversion { .. }));
        }
    }

    #[test]
    fn test_convert_preserves_positions() {
        let mut builder = BlockBuilder::new(ElementType::Long);
        builder.append_long(7);
        builder.append_null();
        builder.begin_position_entry();
        builder.append_long(1);
        builder.append_long(2);
        builder.end_position_entry();
        builder.mv_ordering(MvOrdering::SortedAscending);
        let block = builder.build();

        let text = BlockConverter::new(ElementType::Long, ElementType::Bytes)
            .unwrap()
            .convert(&block)
            .unwrap();
        assert_eq!(text.position_count(), 3);
        assert_eq!(text.position_values(0).collect::<Vec<_>>(), vec![Value::Bytes(b"7")]);
        assert!(text.is_null(1));
        assert_eq!(text.value_count(2), 2);
        assert_eq!(text.mv_ordering(), MvOrdering::Unordered);

        let doubles = BlockConverter::new(ElementType::Long, ElementType::Double)
            .unwrap()
            .convert(&block)
            .unwrap();
        assert_eq!(
            doubles.position_values(2).collect::<Vec<_>>(),
            vec![Value::Double(1.0), Value::Double(2.0)]
        );
        assert_eq!(doubles.mv_ordering(), MvOrdering::SortedAscending);
    }

    #[test]
    fn test_convert_text_to_numbers() {
        let block = Block::from_bytes(["12", " 3.0 ", "-4"]);
        let ints = BlockConverter::new(ElementType::Bytes, ElementType::Int)
            .unwrap()
            .convert(&block)
            .unwrap();
        assert_eq!(ints, Block::from_ints(vec![12, 3, -4]));

        let bad = Block::from_bytes(["1.5"]);
        let err = BlockConverter::new(ElementType::Bytes, ElementType::Long)
            .unwrap()
            .convert(&bad)
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ValueConversion { .. }));
    }

    #[test]
    fn test_all_null_input() {
        let converter = BlockConverter::new(ElementType::Bytes, ElementType::Double).unwrap();
        let block = converter
            .convert(&Block::constant_nulls(ElementType::Null, 3))
            .unwrap();
        assert_eq!(block.element_type(), ElementType::Double);
        assert!(block.are_all_values_null());
    }

    #[test]
    fn test_converting_loader() {
        let mut segment = SegmentBuilder::new(0);
        for v in [3, 1, 2] {
            segment.start_document();
            segment.add_long_doc_values("count", [v]);
        }
        let segment: Arc<dyn SegmentReader> = Arc::new(segment.build().unwrap());

        let inner: Arc<dyn BlockLoader> =
            Arc::new(NumericDocValuesLoader::new("count", NumericKind::Long));
        let loader = TypeConvertingBlockLoader::new(inner, ElementType::Bytes).unwrap();
        assert_eq!(loader.element_type(), ElementType::Bytes);
        assert_eq!(loader.row_stride_element_type(), ElementType::Long);

        let mut reader = loader.column_at_a_time_reader(&segment).unwrap().unwrap();
        assert_eq!(reader.to_string(), "TypeConverting[DocValues.SingletonLongs]");
        assert_eq!(
            reader.read(&[0, 2]).unwrap(),
            Block::from_bytes(["3", "2"])
        );

        let mut reader = loader.row_stride_reader(&segment).unwrap();
        let mut builder = loader.row_stride_builder(2);
        let stored = StoredFieldLoader::empty();
        reader.read(1, &stored, &mut builder).unwrap();
        reader.read(0, &stored, &mut builder).unwrap();
        let block = loader.finish_row_stride(builder.build()).unwrap();
        assert_eq!(block, Block::from_bytes(["1", "3"]));
    }

    #[test]
    fn test_converting_unsupported_loader() {
        let inner: Arc<dyn BlockLoader> =
            Arc::new(NumericDocValuesLoader::new("count", NumericKind::Boolean));
        let err = TypeConvertingBlockLoader::new(inner, ElementType::Long).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnsupportedConversion { .. }));
    }
}
