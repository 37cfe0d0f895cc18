use serde_json::Value;
use tracing::warn;

/// Nested custom client data attached to an inbound event. Field iteration
/// order is insertion order (serde_json is built with `preserve_order`),
/// which makes the flattening output deterministic.
pub type CustomData = serde_json::Map<String, Value>;

/// One dot-qualified key/value fact extracted from a custom data tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenedPair {
    pub key: String,
    pub value: String,
}

/// Classification of a tree field's value. Anything that is neither a nested
/// object nor a scalar (currently: arrays) is invalid and gets skipped.
enum Node<'a> {
    Subtree(&'a CustomData),
    Scalar(String),
    Invalid,
}

fn classify(value: &Value) -> Node<'_> {
    match value {
        Value::Object(map) => Node::Subtree(map),
        Value::String(s) => Node::Scalar(s.clone()),
        Value::Number(n) => Node::Scalar(n.to_string()),
        Value::Bool(b) => Node::Scalar(b.to_string()),
        // A null leaf renders as the text "null", not an empty value.
        Value::Null => Node::Scalar("null".to_string()),
        Value::Array(_) => Node::Invalid,
    }
}

/// Flatten a custom data tree into dot-qualified key/value pairs.
///
/// Depth-first, pre-order, following field insertion order. A tree with no
/// fields contributes exactly one pair with an empty value under the prefix
/// that led to it; with an empty prefix the key is the empty string. Invalid
/// nodes are logged and skipped without aborting their siblings. This
/// function never fails.
pub fn flatten(data: &CustomData, prefix: &[String]) -> Vec<FlattenedPair> {
    let mut path = prefix.to_vec();
    let mut pairs = Vec::new();
    flatten_node(data, &mut path, &mut pairs);
    pairs
}

fn flatten_node(data: &CustomData, path: &mut Vec<String>, pairs: &mut Vec<FlattenedPair>) {
    if data.is_empty() {
        pairs.push(FlattenedPair {
            key: path.join("."),
            value: String::new(),
        });
        return;
    }

    for (name, value) in data {
        path.push(name.clone());
        match classify(value) {
            Node::Subtree(child) => flatten_node(child, path, pairs),
            Node::Scalar(text) => pairs.push(FlattenedPair {
                key: path.join("."),
                value: text,
            }),
            Node::Invalid => {
                warn!(
                    field = %path.join("."),
                    "custom data field is neither an object nor a scalar, skipping"
                );
            }
        }
        path.pop();
    }
}
