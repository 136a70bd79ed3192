use serde_json::Value;

use super::ChildObject;

impl ChildObject {
    /// True when every field `desired` sets already holds the same value here.
    ///
    /// Fields only the live object carries (server defaults, status, extra
    /// labels) are ignored. Lists must match element by element.
    pub fn covers(&self, desired: &ChildObject) -> bool {
        match (self.to_value(), desired.to_value()) {
            (Ok(live), Ok(desired)) => value_covers(&live, &desired),
            _ => false,
        }
    }

    fn to_value(&self) -> serde_json::Result<Value> {
        match self {
            ChildObject::Storage(pvc) => serde_json::to_value(pvc),
            ChildObject::Workload(dep) => serde_json::to_value(dep),
        }
    }
}

pub(crate) fn value_covers(live: &Value, desired: &Value) -> bool {
    match (live, desired) {
        (Value::Object(live), Value::Object(desired)) => {
            desired.iter().all(|(key, d)| match live.get(key) {
                Some(l) => value_covers(l, d),
                None => is_empty(d),
            })
        }
        (Value::Array(live), Value::Array(desired)) => {
            live.len() == desired.len()
                && live.iter().zip(desired).all(|(l, d)| value_covers(l, d))
        }
        _ => live == desired,
    }
}

/// The API server drops empty maps and lists on write.
fn is_empty(v: &Value) -> bool {
    match v {
        Value::Object(m) => m.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}
