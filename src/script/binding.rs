//! The read-only `proxies` binding exposed to snippets.

use std::sync::Arc;

use serde_yaml::{Mapping, Value};
use starlark::values::dict::AllocDict;
use starlark::values::list::AllocList;
use starlark::values::{Heap, Value as StarlarkValue};

use crate::model::Proxy;

/// Snapshot of the baseline proxy list, shareable across evaluation threads.
#[derive(Debug, Clone, Default)]
pub struct ProxyBinding {
    proxies: Arc<[Mapping]>,
}

impl ProxyBinding {
    pub fn new(proxies: &[Proxy]) -> Self {
        Self {
            proxies: proxies.iter().map(Proxy::to_mapping).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Allocate the binding as a Starlark list of dicts on `heap`.
    pub(crate) fn alloc<'v>(&self, heap: &'v Heap) -> StarlarkValue<'v> {
        heap.alloc(AllocList(
            self.proxies.iter().map(|proxy| alloc_mapping(heap, proxy)),
        ))
    }
}

fn alloc_mapping<'v>(heap: &'v Heap, mapping: &Mapping) -> StarlarkValue<'v> {
    // Non-string keys are not addressable from a snippet.
    heap.alloc(AllocDict(mapping.iter().filter_map(|(key, value)| {
        key.as_str().map(|key| (key, alloc_value(heap, value)))
    })))
}

fn alloc_value<'v>(heap: &'v Heap, value: &Value) -> StarlarkValue<'v> {
    match value {
        Value::Null => StarlarkValue::new_none(),
        Value::Bool(b) => StarlarkValue::new_bool(*b),
        Value::Number(n) => match n.as_i64().and_then(|i| i32::try_from(i).ok()) {
            Some(i) => heap.alloc(i),
            None => heap.alloc(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => heap.alloc(s.as_str()),
        Value::Sequence(items) => {
            heap.alloc(AllocList(items.iter().map(|item| alloc_value(heap, item))))
        }
        Value::Mapping(mapping) => alloc_mapping(heap, mapping),
        Value::Tagged(tagged) => alloc_value(heap, &tagged.value),
    }
}
