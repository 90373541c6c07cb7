#[allow(dead_code)]

use yamlet::{ConfigTuple, Loader, LoaderOptions, Value};

/// Load a document from inline YAML, panicking on any load error.
pub fn load(source: &str) -> ConfigTuple {
    Loader::new(LoaderOptions::default())
        .load_str(source, "<test>")
        .expect("document should load")
}

pub fn load_with(options: LoaderOptions, source: &str) -> ConfigTuple {
    Loader::new(options)
        .load_str(source, "<test>")
        .expect("document should load")
}

/// Force `key` and return it as a string, panicking on type mismatch.
pub fn get_str(config: &ConfigTuple, key: &str) -> String {
    match config.get(key).expect("key should force") {
        Value::Str(s) => s.to_string(),
        other => panic!("expected string at `{}`, got {:?}", key, other),
    }
}

pub fn get_int(config: &ConfigTuple, key: &str) -> i64 {
    match config.get(key).expect("key should force") {
        Value::Int(n) => n,
        other => panic!("expected integer at `{}`, got {:?}", key, other),
    }
}

/// Keys of a nested tuple as sorted strings, for set comparisons.
pub fn sorted_keys(config: &ConfigTuple) -> Vec<String> {
    let mut keys: Vec<String> = config
        .keys()
        .expect("keys should resolve")
        .iter()
        .map(|k| k.to_string())
        .collect();
    keys.sort();
    keys
}

/// Keys in definition order.
pub fn ordered_keys(config: &ConfigTuple) -> Vec<String> {
    config
        .keys()
        .expect("keys should resolve")
        .iter()
        .map(|k| k.to_string())
        .collect()
}
