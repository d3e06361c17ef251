//! What the reader is asked to load, and where from.

use std::{fmt, sync::Arc};

use strata_block::element_type::ElementType;
use strata_common::{Result, result::verify_shard_index};
use strata_loader::block_loader::BlockLoader;
use strata_segment::{
    segment::ShardReader,
    source::{SourceLoaderSupplier, StoredSourceLoader},
};

/// Resolves the loader of a field for a shard index.
pub type LoaderFn = Arc<dyn Fn(usize) -> Result<Arc<dyn BlockLoader>> + Send + Sync>;

/// What to extract from a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldExtract {
    /// The values themselves.
    #[default]
    Values,
    /// The dictionary ordinals of a dictionary-encoded field, as `Int`.
    Ordinals,
}

/// A requested field: its output type and a loader per shard.
#[derive(Clone)]
pub struct FieldInfo {
    pub name: String,
    pub element_type: ElementType,
    pub extract: FieldExtract,
    loader: LoaderFn,
}

impl FieldInfo {
    pub fn new(
        name: impl Into<String>,
        element_type: ElementType,
        loader: impl Fn(usize) -> Result<Arc<dyn BlockLoader>> + Send + Sync + 'static,
    ) -> FieldInfo {
        FieldInfo {
            name: name.into(),
            element_type,
            extract: FieldExtract::Values,
            loader: Arc::new(loader),
        }
    }

    /// A field with one prepared loader per shard index.
    pub fn per_shard(
        name: impl Into<String>,
        element_type: ElementType,
        loaders: Vec<Arc<dyn BlockLoader>>,
    ) -> FieldInfo {
        Self::new(name, element_type, move |shard| {
            verify_shard_index(shard, loaders.len())?;
            Ok(loaders[shard].clone())
        })
    }

    /// A field using the same loader on every shard.
    pub fn shared(name: impl Into<String>, loader: Arc<dyn BlockLoader>) -> FieldInfo {
        let element_type = loader.element_type();
        Self::new(name, element_type, move |_| Ok(loader.clone()))
    }

    /// Requests the dictionary ordinals instead of the values.
    pub fn with_extract(mut self, extract: FieldExtract) -> FieldInfo {
        self.extract = extract;
        self
    }

    /// The type of the block the reader appends for this field.
    pub fn output_type(&self) -> ElementType {
        match self.extract {
            FieldExtract::Values => self.element_type,
            FieldExtract::Ordinals => ElementType::Int,
        }
    }

    pub fn loader(&self, shard: usize) -> Result<Arc<dyn BlockLoader>> {
        (self.loader)(shard)
    }
}

impl fmt::Debug for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldInfo")
            .field("name", &self.name)
            .field("element_type", &self.element_type)
            .field("extract", &self.extract)
            .finish_non_exhaustive()
    }
}

/// The segments of one shard and how to rebuild the source of its documents.
#[derive(Clone)]
pub struct ShardContext {
    pub reader: ShardReader,
    pub source_loader: SourceLoaderSupplier,
}

impl ShardContext {
    /// A shard whose source is kept verbatim.
    pub fn new(reader: ShardReader) -> ShardContext {
        ShardContext {
            reader,
            source_loader: StoredSourceLoader::supplier(),
        }
    }

    pub fn with_source_loader(mut self, source_loader: SourceLoaderSupplier) -> ShardContext {
        self.source_loader = source_loader;
        self
    }
}

impl fmt::Debug for ShardContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardContext")
            .field("reader", &self.reader)
            .finish_non_exhaustive()
    }
}
