//! Readers over the test corpus and checks of their output.

use serde_json::Value as JsonValue;
use strata_block::{block::Block, page::Page};
use strata_loader::mapping::DataType;
use strata_testkit::{
    block_json::position_json,
    corpus::{Corpus, CorpusConfig, expected_values},
    pages::page_refs,
};

use crate::{
    config::ReaderConfig,
    field::{FieldInfo, ShardContext},
    field_resolution::{FieldResolution, FieldResolver, ShardMapping},
    values_reader::{ValuesReaderOperator, ValuesReaderOperatorFactory},
};

pub fn corpus() -> Corpus {
    Corpus::build(&CorpusConfig::default()).unwrap()
}

pub fn resolver(corpus: &Corpus) -> FieldResolver {
    FieldResolver::new(
        corpus
            .indices
            .iter()
            .map(|index| {
                index
                    .fields
                    .iter()
                    .cloned()
                    .fold(ShardMapping::new(index.name.as_str()), ShardMapping::with_field)
            })
            .collect(),
    )
}

pub fn contexts(corpus: &Corpus) -> Vec<ShardContext> {
    corpus.shards().cloned().map(ShardContext::new).collect()
}

/// Resolves `name`, reading multi-typed fields as keywords.
pub fn field_info(resolver: &FieldResolver, name: &str) -> FieldInfo {
    match resolver.resolve_field(name) {
        FieldResolution::MultiType(field) => field.resolve(DataType::Keyword).unwrap(),
        other => other.field_info().unwrap(),
    }
}

pub fn factory(corpus: &Corpus, fields: &[&str], config: ReaderConfig) -> ValuesReaderOperatorFactory {
    let resolver = resolver(corpus);
    let fields = fields.iter().map(|name| field_info(&resolver, name)).collect();
    ValuesReaderOperatorFactory::new(fields, contexts(corpus), 0).with_config(config)
}

pub fn operator(corpus: &Corpus, fields: &[&str]) -> ValuesReaderOperator {
    factory(corpus, fields, ReaderConfig::default()).get().unwrap()
}

/// Checks every field block of `page` against the corpus. `fields` are the
/// names of the blocks following the doc block, in order.
pub fn check_page(corpus: &Corpus, page: &Page, fields: &[&str]) {
    assert_eq!(page.block_count(), fields.len() + 1);
    let refs = page_refs(page);
    for (i, field) in fields.iter().enumerate() {
        let block = page.block(i + 1);
        assert_eq!(block.position_count(), refs.len(), "{field}");
        for (position, &(shard, segment, doc)) in refs.iter().enumerate() {
            let key = corpus.key(shard, segment, doc);
            let expected = if corpus.indices[shard as usize].field(field).is_some() {
                expected_values(shard as usize, field, key)
            } else {
                vec![]
            };
            assert_eq!(
                position_json(block, position),
                expected,
                "field {field} at {position} (shard {shard}, segment {segment}, doc {doc})"
            );
        }
    }
}

pub fn blocks_json(page: &Page) -> Vec<Vec<Vec<JsonValue>>> {
    page.blocks()
        .iter()
        .skip(1)
        .map(strata_testkit::block_json::block_json)
        .collect()
}

pub fn field_block<'a>(page: &'a Page, fields: &[&str], name: &str) -> &'a Block {
    let i = fields
        .iter()
        .position(|f| *f == name)
        .expect("field not requested");
    page.block(i + 1)
}
