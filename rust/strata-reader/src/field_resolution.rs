//! Resolution of a field name against the mappings of every shard.
//!
//! A field mapped with different types in different indices can only be read
//! once the query picks a target type; every shard whose native type differs
//! then reads through a converting loader.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::Arc,
};

use ahash::AHashMap;
use itertools::Itertools;
use strata_block::element_type::ElementType;
use strata_common::{Result, error::Error};
use strata_loader::{
    block_loader::BlockLoader,
    constant::ConstantNullsLoader,
    converting::TypeConvertingBlockLoader,
    mapping::{DataType, MappedField},
};

use crate::field::FieldInfo;

/// The mapping of the index a shard belongs to.
#[derive(Debug, Clone)]
pub struct ShardMapping {
    pub index: String,
    fields: AHashMap<String, MappedField>,
}

impl ShardMapping {
    pub fn new(index: impl Into<String>) -> ShardMapping {
        ShardMapping {
            index: index.into(),
            fields: AHashMap::new(),
        }
    }

    pub fn with_field(mut self, field: MappedField) -> ShardMapping {
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&MappedField> {
        self.fields.get(name)
    }
}

/// Resolves fields against the mappings of a shard set, indexed by shard.
#[derive(Debug, Clone, Default)]
pub struct FieldResolver {
    shards: Vec<ShardMapping>,
}

impl FieldResolver {
    pub fn new(shards: Vec<ShardMapping>) -> FieldResolver {
        FieldResolver { shards }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn resolve_field(&self, name: &str) -> FieldResolution {
        let shard_fields = self
            .shards
            .iter()
            .map(|shard| shard.field(name).cloned())
            .collect::<Vec<_>>();
        let present = shard_fields.iter().flatten().collect::<Vec<_>>();
        let Some(first) = present.first() else {
            return FieldResolution::Missing(name.to_string());
        };
        let first_type = first.data_type;
        if present
            .iter()
            .all(|f| f.data_type.element_type() == first_type.element_type())
        {
            return FieldResolution::Single(TypedField {
                name: name.to_string(),
                data_type: first_type,
                shard_fields,
            });
        }

        let mut types_to_indices: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (shard, field) in self.shards.iter().zip(&shard_fields) {
            if let Some(field) = field {
                types_to_indices
                    .entry(field.data_type.name().to_string())
                    .or_default()
                    .insert(shard.index.clone());
            }
        }
        FieldResolution::MultiType(MultiTypeField {
            name: name.to_string(),
            types_to_indices,
            shard_fields,
        })
    }
}

/// The outcome of resolving a field name.
#[derive(Debug, Clone)]
pub enum FieldResolution {
    /// Every shard mapping the field agrees on its type.
    Single(TypedField),
    /// Shards disagree; a target type must be chosen.
    MultiType(MultiTypeField),
    /// No shard maps the field.
    Missing(String),
}

impl FieldResolution {
    /// Builds the field to read without choosing a type. Multi-typed fields
    /// fail with `InvalidMappedField`; missing fields read as nulls.
    pub fn field_info(&self) -> Result<FieldInfo> {
        match self {
            FieldResolution::Single(field) => Ok(field.field_info()),
            FieldResolution::MultiType(field) => Err(field.to_error()),
            FieldResolution::Missing(name) => Ok(FieldInfo::shared(
                name.as_str(),
                Arc::new(ConstantNullsLoader::new(ElementType::Null)),
            )),
        }
    }
}

/// A field with one type across the shard set.
#[derive(Debug, Clone)]
pub struct TypedField {
    name: String,
    data_type: DataType,
    shard_fields: Vec<Option<MappedField>>,
}

impl TypedField {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Shards that do not map the field read nulls of its type.
    pub fn field_info(&self) -> FieldInfo {
        let element_type = self.data_type.element_type();
        let loaders = self
            .shard_fields
            .iter()
            .map(|field| match field {
                Some(field) => field.block_loader(),
                None => Arc::new(ConstantNullsLoader::new(element_type)) as Arc<dyn BlockLoader>,
            })
            .collect();
        FieldInfo::per_shard(self.name.as_str(), element_type, loaders)
    }
}

/// A field mapped with incompatible types in different indices.
#[derive(Debug, Clone)]
pub struct MultiTypeField {
    name: String,
    types_to_indices: BTreeMap<String, BTreeSet<String>>,
    shard_fields: Vec<Option<MappedField>>,
}

impl MultiTypeField {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type name to the sorted names of the indices mapping the field with it.
    pub fn types_to_indices(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.types_to_indices
    }

    pub fn message(&self) -> String {
        format!(
            "mapped as [{}] incompatible types: {}",
            self.types_to_indices.len(),
            self.types_to_indices
                .iter()
                .map(|(ty, indices)| format!("[{ty}] in [{}]", indices.iter().join(", ")))
                .join(", ")
        )
    }

    pub fn to_error(&self) -> Error {
        Error::invalid_mapped_field(self.name.as_str(), self.message())
    }

    /// Builds the field read as `target`. Shards of another type convert
    /// their values; an unsupported conversion fails here.
    pub fn resolve(&self, target: DataType) -> Result<FieldInfo> {
        let element_type = target.element_type();
        let loaders = self
            .shard_fields
            .iter()
            .map(|field| -> Result<Arc<dyn BlockLoader>> {
                let Some(field) = field else {
                    return Ok(Arc::new(ConstantNullsLoader::new(element_type)));
                };
                let loader = field.block_loader();
                if loader.element_type() == element_type {
                    Ok(loader)
                } else {
                    Ok(Arc::new(TypeConvertingBlockLoader::new(loader, element_type)?))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(FieldInfo::per_shard(self.name.as_str(), element_type, loaders))
    }
}

impl fmt::Display for MultiTypeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::error::ErrorKind;

    fn resolver() -> FieldResolver {
        let a = |index: &str| {
            ShardMapping::new(index)
                .with_field(MappedField::new("count", DataType::Keyword))
                .with_field(MappedField::new("size", DataType::Long))
        };
        FieldResolver::new(vec![
            a("logs-a"),
            a("logs-b"),
            ShardMapping::new("logs-c")
                .with_field(MappedField::new("count", DataType::Long))
                .with_field(MappedField::new("size", DataType::Long)),
            ShardMapping::new("logs-d")
                .with_field(MappedField::new("count", DataType::Boolean)),
        ])
    }

    #[test]
    fn test_single_and_missing() {
        let resolver = resolver();
        let FieldResolution::Single(size) = resolver.resolve_field("size") else {
            panic!("size has one type");
        };
        assert_eq!(size.data_type(), DataType::Long);
        let info = size.field_info();
        assert_eq!(info.element_type, ElementType::Long);
        assert_eq!(
            info.loader(3).unwrap().element_type(),
            ElementType::Long
        );
        assert!(info.loader(4).is_err());

        let missing = resolver.resolve_field("nope");
        assert!(matches!(missing, FieldResolution::Missing(_)));
        assert_eq!(missing.field_info().unwrap().element_type, ElementType::Null);
    }

    #[test]
    fn test_multi_type_message() {
        let FieldResolution::MultiType(count) = resolver().resolve_field("count") else {
            panic!("count has three types");
        };
        assert_eq!(
            count.message(),
            "mapped as [3] incompatible types: [boolean] in [logs-d], [keyword] in [logs-a, logs-b], [long] in [logs-c]"
        );
        let err = FieldResolution::MultiType(count).field_info().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidMappedField { .. }));
        assert!(err.is_configuration_fault());
    }

    #[test]
    fn test_multi_type_resolve() {
        let FieldResolution::MultiType(count) = resolver().resolve_field("count") else {
            panic!("count has three types");
        };
        let info = count.resolve(DataType::Keyword).unwrap();
        assert_eq!(info.element_type, ElementType::Bytes);
        for shard in 0..4 {
            assert_eq!(info.loader(shard).unwrap().element_type(), ElementType::Bytes);
        }
        assert!(info.loader(2).unwrap().row_stride_conversion().is_some());
        assert!(info.loader(0).unwrap().row_stride_conversion().is_none());

        let err = count.resolve(DataType::Double).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnsupportedConversion { .. }));
    }
}
