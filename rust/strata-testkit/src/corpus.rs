//! A deterministic test corpus of two indices.
//!
//! Every document carries a `key`, unique across the corpus, from which the
//! values of all other fields derive. [`expected_values`] returns what a
//! loader should produce for a field and key, in the order it should produce
//! them, so tests can check any page of documents without keeping the data
//! around.
//!
//! The two indices share most of their mapping. They differ on:
//! - `str_long` and `str_double`: keyword in the first index, numeric in the
//!   second
//! - `missing_long` and `missing_kwd`: only mapped (and populated) in the
//!   second index

use std::sync::Arc;

use anyhow::Context;
use serde_json::{Map, Value as JsonValue, json};
use strata_loader::mapping::{DataType, MappedField};
use strata_segment::{
    memory::SegmentBuilder,
    segment::{SegmentReader, ShardReader},
    stored::{ID_FIELD, StoredValue},
};

pub const INDEX_NAMES: [&str; 2] = ["test-a", "test-b"];

/// Every field name the corpus maps in at least one index.
pub const FIELDS: &[&str] = &[
    "key",
    "long",
    "int",
    "short",
    "byte",
    "double",
    "bool",
    "kwd",
    "mv_long",
    "mv_int",
    "mv_double",
    "mv_kwd",
    "str_long",
    "str_double",
    "missing_long",
    "missing_kwd",
    "source_long",
    "source_int",
    "source_double",
    "source_bool",
    "source_kwd",
    "mv_source_long",
    "mv_source_kwd",
    "stored_kwd",
    "mv_stored_kwd",
    "text",
    "mv_text",
    ID_FIELD,
];

#[derive(Debug, Clone)]
pub struct CorpusConfig {
    /// Documents per index.
    pub docs_per_index: usize,
    /// A new segment is started after this many documents.
    pub commit_every: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        CorpusConfig {
            docs_per_index: 120,
            commit_every: 25,
        }
    }
}

/// One index of the corpus, served by one shard.
#[derive(Debug, Clone)]
pub struct TestIndex {
    pub name: String,
    pub shard: ShardReader,
    pub fields: Vec<MappedField>,
    /// Key of the first document of each segment.
    segment_keys: Vec<i64>,
}

impl TestIndex {
    pub fn index(&self) -> usize {
        INDEX_NAMES
            .iter()
            .position(|name| *name == self.name)
            .unwrap_or_default()
    }

    pub fn field(&self, name: &str) -> Option<&MappedField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Corpus {
    pub indices: Vec<TestIndex>,
}

impl Corpus {
    /// Builds both indices. Keys are numbered consecutively, the second
    /// index continuing where the first stops.
    pub fn build(config: &CorpusConfig) -> anyhow::Result<Corpus> {
        anyhow::ensure!(config.commit_every > 0, "commit_every must be positive");
        let indices = INDEX_NAMES
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let first_key = (index * config.docs_per_index) as i64;
                build_index(index, name, first_key, config)
                    .with_context(|| format!("building index {name}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Corpus { indices })
    }

    pub fn shards(&self) -> impl Iterator<Item = &ShardReader> {
        self.indices.iter().map(|index| &index.shard)
    }

    /// The key of a document.
    ///
    /// # Panics
    ///
    /// Panics if the reference is outside the corpus.
    pub fn key(&self, shard: u32, segment: u32, doc: u32) -> i64 {
        let index = &self.indices[shard as usize];
        let segment_max = index.shard.segments()[segment as usize].max_doc();
        assert!(doc < segment_max, "doc {doc} out of segment {segment}");
        index.segment_keys[segment as usize] + doc as i64
    }

    /// Every document of the corpus in (shard, segment, doc) order.
    pub fn doc_refs(&self) -> Vec<(u32, u32, u32)> {
        let mut refs = Vec::new();
        for (shard, index) in self.indices.iter().enumerate() {
            for (segment, reader) in index.shard.segments().iter().enumerate() {
                for doc in 0..reader.max_doc() {
                    refs.push((shard as u32, segment as u32, doc));
                }
            }
        }
        refs
    }
}

fn build_index(
    index: usize,
    name: &str,
    first_key: i64,
    config: &CorpusConfig,
) -> anyhow::Result<TestIndex> {
    let mut segments: Vec<Arc<dyn SegmentReader>> = Vec::new();
    let mut segment_keys = Vec::new();
    let mut builder: Option<SegmentBuilder> = None;
    for d in 0..config.docs_per_index {
        let key = first_key + d as i64;
        if d % config.commit_every == 0 {
            if let Some(full) = builder.take() {
                segments.push(Arc::new(full.build()?));
            }
            builder = Some(SegmentBuilder::new(segments.len() as u32));
            segment_keys.push(key);
        }
        if let Some(builder) = builder.as_mut() {
            add_document(builder, index, key)?;
        }
    }
    if let Some(last) = builder {
        segments.push(Arc::new(last.build()?));
    }
    Ok(TestIndex {
        name: name.to_string(),
        shard: ShardReader::new(segments),
        fields: mapping(index),
        segment_keys,
    })
}

/// The mapping of the index at `index`.
pub fn mapping(index: usize) -> Vec<MappedField> {
    let source_only = |name: &str, data_type| MappedField::new(name, data_type).with_doc_values(false);
    let stored = |name: &str| {
        MappedField::new(name, DataType::Keyword)
            .with_doc_values(false)
            .with_stored(true)
    };
    let mut fields = vec![
        MappedField::new("key", DataType::Long),
        MappedField::new("long", DataType::Long),
        MappedField::new("int", DataType::Integer),
        MappedField::new("short", DataType::Short),
        MappedField::new("byte", DataType::Byte),
        MappedField::new("double", DataType::Double),
        MappedField::new("bool", DataType::Boolean),
        MappedField::new("kwd", DataType::Keyword),
        MappedField::new("mv_long", DataType::Long),
        MappedField::new("mv_int", DataType::Integer),
        MappedField::new("mv_double", DataType::Double),
        MappedField::new("mv_kwd", DataType::Keyword),
        source_only("source_long", DataType::Long),
        source_only("source_int", DataType::Integer),
        source_only("source_double", DataType::Double),
        source_only("source_bool", DataType::Boolean),
        source_only("source_kwd", DataType::Keyword),
        source_only("mv_source_long", DataType::Long),
        source_only("mv_source_kwd", DataType::Keyword),
        stored("stored_kwd"),
        stored("mv_stored_kwd"),
        MappedField::new("text", DataType::Text),
        MappedField::new("mv_text", DataType::Text),
        MappedField::new(ID_FIELD, DataType::Keyword),
    ];
    if index == 0 {
        fields.push(MappedField::new("str_long", DataType::Keyword));
        fields.push(MappedField::new("str_double", DataType::Keyword));
    } else {
        fields.push(MappedField::new("str_long", DataType::Long));
        fields.push(MappedField::new("str_double", DataType::Double));
        fields.push(MappedField::new("missing_long", DataType::Long));
        fields.push(MappedField::new("missing_kwd", DataType::Keyword));
    }
    fields
}

/// Up to three values, with a duplicate when there are three.
fn mv_longs(key: i64) -> Vec<i64> {
    let mut values = vec![key, key - 1, key];
    values.truncate(1 + (key % 3) as usize);
    values
}

fn has_mv(key: i64) -> bool {
    key % 5 != 0
}

fn has_source_value(key: i64) -> bool {
    key % 11 != 0
}

fn add_document(builder: &mut SegmentBuilder, index: usize, key: i64) -> anyhow::Result<()> {
    builder.start_document();
    builder
        .add_long_doc_values("key", [key])
        .add_long_doc_values("long", [key])
        .add_long_doc_values("int", [key])
        .add_long_doc_values("short", [key % 1000])
        .add_long_doc_values("byte", [key % 100])
        .add_double_doc_values("double", [key as f64 / 4.0])
        .add_boolean_doc_values("bool", [key % 2 == 0])
        .add_keyword_doc_values("kwd", [format!("kwd-{key}")]);
    if has_mv(key) {
        let values = mv_longs(key);
        builder
            .add_long_doc_values("mv_long", values.iter().copied())
            .add_long_doc_values("mv_int", values.iter().copied())
            .add_double_doc_values("mv_double", values.iter().map(|&v| v as f64 / 2.0))
            .add_keyword_doc_values("mv_kwd", values.iter().map(|v| format!("mv-{v}")));
    }
    if index == 0 {
        builder
            .add_keyword_doc_values("str_long", [key.to_string()])
            .add_keyword_doc_values("str_double", [format!("{key}.5")]);
    } else {
        builder
            .add_long_doc_values("str_long", [key])
            .add_double_doc_values("str_double", [key as f64 + 0.5])
            .add_long_doc_values("missing_long", [key])
            .add_keyword_doc_values("missing_kwd", [format!("m-{key}")]);
    }

    builder
        .add_stored_value(ID_FIELD, StoredValue::Bytes(format!("id-{key}").into_bytes()))
        .add_stored_value(
            "stored_kwd",
            StoredValue::Bytes(format!("stored-{key}").into_bytes()),
        );
    if has_mv(key) {
        for value in [format!("b-{key}"), format!("a-{key}")] {
            builder.add_stored_value("mv_stored_kwd", StoredValue::Bytes(value.into_bytes()));
        }
    }

    let mut source = Map::new();
    source.insert("key".to_string(), json!(key));
    if has_source_value(key) {
        source.insert("source_long".to_string(), json!(key));
        source.insert("source_int".to_string(), json!(key));
        source.insert("source_double".to_string(), json!(key as f64 / 4.0));
        source.insert("source_bool".to_string(), json!(key % 2 == 0));
        source.insert("source_kwd".to_string(), json!(format!("src-{key}")));
    }
    if has_mv(key) {
        source.insert("mv_source_long".to_string(), json!(mv_longs(key)));
        source.insert(
            "mv_source_kwd".to_string(),
            json!([format!("b-{key}"), format!("a-{key}")]),
        );
    }
    source.insert("text".to_string(), json!(format!("text {key}")));
    source.insert(
        "mv_text".to_string(),
        json!([format!("text b {key}"), format!("text a {key}")]),
    );
    builder.set_source(&JsonValue::Object(source))?;
    Ok(())
}

/// The values a loader produces for `field` of the document with `key` in
/// the index at `index`, in load order.
///
/// `str_long` and `str_double` are given as text, which is how tests read
/// them across both indices. Doc values come out sorted; stored fields and
/// the source keep their insertion order.
///
/// # Panics
///
/// Panics on a field the corpus does not know.
pub fn expected_values(index: usize, field: &str, key: i64) -> Vec<JsonValue> {
    let mv = |values: Vec<JsonValue>| if has_mv(key) { values } else { vec![] };
    let source = |value: JsonValue| {
        if has_source_value(key) {
            vec![value]
        } else {
            vec![]
        }
    };
    match field {
        "key" | "long" | "int" => vec![json!(key)],
        "short" => vec![json!(key % 1000)],
        "byte" => vec![json!(key % 100)],
        "double" => vec![json!(key as f64 / 4.0)],
        "bool" => vec![json!(key % 2 == 0)],
        "kwd" => vec![json!(format!("kwd-{key}"))],
        "mv_long" | "mv_int" => {
            let mut values = mv_longs(key);
            values.sort_unstable();
            mv(values.into_iter().map(|v| json!(v)).collect())
        }
        "mv_double" => {
            let mut values = mv_longs(key);
            values.sort_unstable();
            mv(values.into_iter().map(|v| json!(v as f64 / 2.0)).collect())
        }
        "mv_kwd" => {
            let mut values = mv_longs(key)
                .into_iter()
                .map(|v| format!("mv-{v}"))
                .collect::<Vec<_>>();
            values.sort_unstable();
            values.dedup();
            mv(values.into_iter().map(|v| json!(v)).collect())
        }
        "str_long" => vec![json!(key.to_string())],
        "str_double" => vec![json!(format!("{key}.5"))],
        "missing_long" if index == 1 => vec![json!(key)],
        "missing_kwd" if index == 1 => vec![json!(format!("m-{key}"))],
        "missing_long" | "missing_kwd" => vec![],
        "source_long" | "source_int" => source(json!(key)),
        "source_double" => source(json!(key as f64 / 4.0)),
        "source_bool" => source(json!(key % 2 == 0)),
        "source_kwd" => source(json!(format!("src-{key}"))),
        "mv_source_long" => mv(mv_longs(key).into_iter().map(|v| json!(v)).collect()),
        "mv_source_kwd" | "mv_stored_kwd" => {
            mv(vec![json!(format!("b-{key}")), json!(format!("a-{key}"))])
        }
        "stored_kwd" => vec![json!(format!("stored-{key}"))],
        "text" => vec![json!(format!("text {key}"))],
        "mv_text" => vec![json!(format!("text b {key}")), json!(format!("text a {key}"))],
        ID_FIELD => vec![json!(format!("id-{key}"))],
        other => panic!("unknown corpus field {other}"),
    }
}
