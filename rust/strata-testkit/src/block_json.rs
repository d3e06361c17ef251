//! Block contents as JSON, for comparing loaded values against expectations.

use serde_json::{Value as JsonValue, json};
use strata_block::{block::Block, values::Value};

/// Converts one value. Byte strings are decoded as (lossy) UTF-8 and doc
/// references become `[shard, segment, doc]`.
pub fn value_to_json(value: Value<'_>) -> JsonValue {
    match value {
        Value::Boolean(v) => json!(v),
        Value::Int(v) => json!(v),
        Value::Long(v) => json!(v),
        Value::Double(v) => json!(v),
        Value::Bytes(v) => json!(String::from_utf8_lossy(v)),
        Value::Doc {
            shard,
            segment,
            doc,
        } => json!([shard, segment, doc]),
    }
}

/// The values at `position`, in block order. A null position is empty.
pub fn position_json(block: &Block, position: usize) -> Vec<JsonValue> {
    block.position_values(position).map(value_to_json).collect()
}

/// Every position of the block.
pub fn block_json(block: &Block) -> Vec<Vec<JsonValue>> {
    (0..block.position_count())
        .map(|position| position_json(block, position))
        .collect()
}
