use crate::builder::Document;
use crate::value::{Map, Value};

/// Deep-merge `src` into `dst`.
///
/// Keys missing from `dst` are moved in; when both sides hold maps the merge recurses;
/// any other collision is resolved in favor of `src`. Lists are replaced, never concatenated.
pub fn merge(dst: &mut Map, src: Map) {
    for (key, incoming) in src {
        match incoming {
            Value::Map(incoming) => match dst.get_mut(&key) {
                Some(Value::Map(existing)) => merge(existing, incoming),
                _ => {
                    dst.insert(key, Value::Map(incoming));
                }
            },
            other => {
                dst.insert(key, other);
            }
        }
    }
}

/// Fold documents in the given order; later documents win scalar conflicts.
pub fn merge_documents(documents: impl IntoIterator<Item = Document>) -> Document {
    let mut root = Map::new();
    for doc in documents {
        merge(&mut root, doc.into_map());
    }
    Document::from_map(root)
}
