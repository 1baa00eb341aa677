use serde_json::{Map, Value};

/// Result of stepping from one JSON object into a child key.
#[derive(Debug)]
pub enum ObjectLookup<'a> {
    Found(&'a mut Map<String, Value>),
    Missing,
    WrongType,
}

pub fn descend<'a>(object: &'a mut Map<String, Value>, key: &str) -> ObjectLookup<'a> {
    match object.get_mut(key) {
        Some(Value::Object(child)) => ObjectLookup::Found(child),
        Some(_) => ObjectLookup::WrongType,
        None => ObjectLookup::Missing,
    }
}

#[cfg(test)]
#[path = "lookup_test.rs"]
mod tests;
