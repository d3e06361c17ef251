use strata_block::{element_type::ElementType, page::Page};
use strata_loader::mapping::DataType;
use strata_reader::{
    config::ReaderConfig,
    field::{FieldInfo, ShardContext},
    field_resolution::{FieldResolution, FieldResolver, ShardMapping},
    operator::Operator,
    values_reader::ValuesReaderOperatorFactory,
};
use strata_segment::source::StoredSourceLoader;
use strata_testkit::{
    block_json::position_json,
    corpus::{Corpus, CorpusConfig, expected_values},
    pages::{doc_pages, page_refs, shuffle_page},
};

fn setup(config: &CorpusConfig) -> (Corpus, FieldResolver, Vec<ShardContext>) {
    let corpus = Corpus::build(config).unwrap();
    let resolver = FieldResolver::new(
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
    );
    let contexts = corpus
        .shards()
        .map(|shard| {
            ShardContext::new(shard.clone()).with_source_loader(StoredSourceLoader::supplier())
        })
        .collect();
    (corpus, resolver, contexts)
}

fn resolve(resolver: &FieldResolver, name: &str, target: DataType) -> FieldInfo {
    match resolver.resolve_field(name) {
        FieldResolution::MultiType(field) => field.resolve(target).unwrap(),
        other => other.field_info().unwrap(),
    }
}

fn check(corpus: &Corpus, page: &Page, channel: usize, field: &str) {
    for (position, (shard, segment, doc)) in page_refs(page).into_iter().enumerate() {
        let key = corpus.key(shard, segment, doc);
        let expected = match corpus.indices[shard as usize].field(field) {
            Some(_) => expected_values(shard as usize, field, key),
            None => vec![],
        };
        assert_eq!(position_json(page.block(channel), position), expected, "{field}");
    }
}

#[test]
fn test_config_from_json() {
    let config = ReaderConfig::from_json(
        r#"{ "sequential_stored_fields_threshold": 2, "column_at_a_time": false }"#,
    )
    .unwrap();
    assert_eq!(config.sequential_stored_fields_threshold, 2);
    assert!(!config.column_at_a_time);
    assert!(ReaderConfig::from_json(r#"{ "describe_field_limit": 0 }"#).is_err());
}

#[test]
fn test_chained_readers() {
    // A second reader appends to the page produced by the first.
    let (corpus, resolver, contexts) = setup(&CorpusConfig {
        docs_per_index: 64,
        commit_every: 9,
    });
    let first = ValuesReaderOperatorFactory::new(
        vec![
            resolve(&resolver, "kwd", DataType::Keyword),
            resolve(&resolver, "str_double", DataType::Keyword),
        ],
        contexts.clone(),
        0,
    );
    let second = ValuesReaderOperatorFactory::new(
        vec![
            resolve(&resolver, "mv_source_kwd", DataType::Keyword),
            resolve(&resolver, "missing_long", DataType::Long),
        ],
        contexts,
        0,
    )
    .with_partition(1)
    .with_config(ReaderConfig {
        sequential_stored_fields_threshold: 3,
        ..Default::default()
    });

    let mut a = first.get().unwrap();
    let mut b = second.get().unwrap();
    assert_eq!(b.partition(), 1);
    let mut rng = fastrand::Rng::with_seed(64);
    for page in doc_pages(&corpus, 20) {
        let page = shuffle_page(&page, &mut rng);
        a.add_input(page).unwrap();
        let page = a.get_output().unwrap().unwrap();
        b.add_input(page).unwrap();
        let page = b.get_output().unwrap().unwrap();

        assert_eq!(page.block_count(), 5);
        check(&corpus, &page, 1, "kwd");
        check(&corpus, &page, 2, "str_double");
        check(&corpus, &page, 3, "mv_source_kwd");
        check(&corpus, &page, 4, "missing_long");
        assert_eq!(page.block(4).element_type(), ElementType::Long);
    }
    a.finish();
    b.finish();
    assert!(a.is_finished() && b.is_finished());
    assert!(!a.needs_input());
    assert_eq!(a.status().pages_processed, b.status().pages_processed);
    assert_eq!(
        Operator::status(&a).unwrap()["pages_processed"],
        serde_json::json!(a.status().pages_processed)
    );
}

#[test]
fn test_field_resolved_per_shard() {
    let (corpus, _, contexts) = setup(&CorpusConfig {
        docs_per_index: 10,
        commit_every: 10,
    });
    // Reads `long` from the first index and `key` from the second.
    let field = FieldInfo::new("long_or_key", ElementType::Long, |shard| {
        let name = if shard == 0 { "long" } else { "key" };
        Ok(strata_loader::mapping::MappedField::new(name, DataType::Long).block_loader())
    });
    let mut op = ValuesReaderOperatorFactory::new(vec![field], contexts, 0)
        .get()
        .unwrap();
    for page in doc_pages(&corpus, 7) {
        op.add_input(page).unwrap();
        let page = op.get_output().unwrap().unwrap();
        check(&corpus, &page, 1, "long");
    }
}
