//! Hierarchical option trees.
//!
//! An [`Options`] value is a handle to a node: a map from key to
//! [`OptionValue`] guarded by its own lock. Cloning the handle shares the
//! node; [`Options::deep_clone`] copies it. Paths are dot separated
//! (`"db.primary.host"`).
//!
//! Every accessor takes the node's lock for the duration of the call only.
//! Navigation releases a node's lock before taking the next one, so readers
//! and writers of different nodes never block each other.

mod getters;
mod render;
mod value;

pub use value::OptionValue;

use crate::core::{ConfigError, ConfigResult};
use crate::format::{self, Format, ParseLimits};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Key to value mapping held by a single node
pub type OptionMap = BTreeMap<String, OptionValue>;

/// Handle to a node in an option tree.
#[derive(Clone, Default)]
pub struct Options {
    map: Arc<RwLock<OptionMap>>,
    file_path: Option<Arc<Path>>,
}

impl Options {
    /// Create an empty node
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node that owns `map`
    pub fn from_map(map: OptionMap) -> Self {
        Self {
            map: Arc::new(RwLock::new(map)),
            file_path: None,
        }
    }

    /// Convert a JSON object into a tree
    pub fn from_json(value: serde_json::Value) -> ConfigResult<Self> {
        match OptionValue::from(value) {
            OptionValue::Node(node) => Ok(node),
            other => Err(ConfigError::type_error(
                format!("expected an object, found {}", other.type_name()),
                "object",
            )),
        }
    }

    /// Decode a structured document. [`Format::Auto`] is rejected since there
    /// is no file name to infer the format from.
    pub fn from_text(text: &str, format: Format) -> ConfigResult<Self> {
        format::document::decode(text, format).map(Self::from_map)
    }

    /// Read and decode a structured document
    pub fn from_reader<R: Read>(mut reader: R, format: Format) -> ConfigResult<Self> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| ConfigError::file_access("<reader>", e.to_string()))?;
        Self::from_text(&text, format)
    }

    /// Load a document from disk, inferring the format from the extension
    /// when `format` is [`Format::Auto`]. The tree remembers the path so
    /// `@file` references resolve relative to it.
    pub fn from_file(path: impl AsRef<Path>, format: Format) -> ConfigResult<Self> {
        let path = path.as_ref();
        let format = format.resolve(path)?;
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, &e))?;
        Ok(Self::from_text(&text, format)?.with_file_path(path))
    }

    /// Encode the tree as a structured document
    pub fn to_text(&self, format: Format) -> ConfigResult<String> {
        format::document::encode(self, format)
    }

    /// Write the tree to disk as a structured document
    pub fn to_file(&self, path: impl AsRef<Path>, format: Format) -> ConfigResult<()> {
        let path = path.as_ref();
        let text = self.to_text(format.resolve(path)?)?;
        std::fs::write(path, text).map_err(|e| ConfigError::io(path, &e))
    }

    /// Attach the file the tree was loaded from
    pub fn with_file_path(mut self, path: impl AsRef<Path>) -> Self {
        self.file_path = Some(Arc::from(path.as_ref()));
        self
    }

    /// File the tree was loaded from, if any
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Resolve `name` relative to the directory of [`Options::file_path`]
    pub fn resolve_path(&self, name: impl AsRef<Path>) -> PathBuf {
        let base = self
            .file_path
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new(""));
        base.join(name)
    }

    /// Replace the node's content with escaped `key=value;` text using the
    /// default [`ParseLimits`].
    ///
    /// On error the node is left empty.
    pub fn parse(&self, text: &str) -> ConfigResult<()> {
        self.parse_with_limits(text, ParseLimits::default())
    }

    /// [`Options::parse`] with explicit size limits
    pub fn parse_with_limits(&self, text: &str, limits: ParseLimits) -> ConfigResult<()> {
        match format::parse_escaped(text, limits) {
            Ok(map) => {
                self.assign(map);
                Ok(())
            }
            Err(err) => {
                self.clear();
                Err(err)
            }
        }
    }

    /// The sub-tree at `path`.
    ///
    /// The returned handle shares the node with this tree. A string value
    /// starting with `@` is treated as a file reference: the named document
    /// is loaded relative to the file of the node holding it. References are
    /// followed in intermediate segments too, so `get("a").get("b")` and
    /// `get("a.b")` agree. Missing paths, non-node values and unreadable
    /// references all yield an empty node.
    pub fn get(&self, path: &str) -> Options {
        let Some((owner, value)) = self.lookup(path) else {
            return Options::new();
        };
        owner.descend(value).unwrap_or_default()
    }

    /// The raw value at `path`
    pub fn get_object(&self, path: &str) -> Option<OptionValue> {
        self.lookup(path).map(|(_, value)| value)
    }

    /// Set the value at `path`, creating intermediate nodes and replacing
    /// non-node intermediates. Returns the previous value.
    pub fn set(&self, path: &str, value: impl Into<OptionValue>) -> Option<OptionValue> {
        let (parents, last) = split_path(path);
        let mut map = Arc::clone(&self.map);
        if let Some(parents) = parents {
            for segment in parents.split('.') {
                let next = {
                    let mut guard = map.write();
                    let existing = match guard.get(segment) {
                        Some(OptionValue::Node(child)) => Some(Arc::clone(&child.map)),
                        _ => None,
                    };
                    match existing {
                        Some(handle) => handle,
                        None => {
                            let child = Options::new();
                            let handle = Arc::clone(&child.map);
                            guard.insert(segment.to_string(), OptionValue::Node(child));
                            handle
                        }
                    }
                };
                map = next;
            }
        }
        let previous = map.write().insert(last.to_string(), value.into());
        previous
    }

    /// Remove the value at `path`, returning it
    pub fn remove(&self, path: &str) -> Option<OptionValue> {
        let (parents, last) = split_path(path);
        let target = match parents {
            Some(parents) => self.get_object(parents)?.as_node()?.clone(),
            None => self.clone(),
        };
        let removed = target.map.write().remove(last);
        removed
    }

    /// Whether a value exists at `path`
    pub fn exists(&self, path: &str) -> bool {
        self.get_object(path).is_some()
    }

    /// Whether the node has no keys
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    /// Number of keys in the node
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// Keys of the node in sorted order
    pub fn keys(&self) -> Vec<String> {
        self.map.read().keys().cloned().collect()
    }

    /// Replace the node's content
    pub fn assign(&self, map: OptionMap) {
        *self.map.write() = map;
    }

    /// Remove every key
    pub fn clear(&self) {
        self.map.write().clear();
    }

    /// Shallow copy of the node's map. Nested nodes stay shared.
    pub fn to_map(&self) -> OptionMap {
        self.map.read().clone()
    }

    /// Copy the whole tree so no node is shared with `self`
    pub fn deep_clone(&self) -> Self {
        let map = self
            .map
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.deep_clone()))
            .collect();
        Self {
            map: Arc::new(RwLock::new(map)),
            file_path: self.file_path.clone(),
        }
    }

    /// Whether both handles point at the same node
    pub fn ptr_eq(&self, other: &Options) -> bool {
        Arc::ptr_eq(&self.map, &other.map)
    }

    /// Convert into a plain JSON object
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.map
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Deserialize the tree into `T`
    pub fn as_struct<T: DeserializeOwned>(&self) -> ConfigResult<T> {
        serde_json::from_value(self.to_json_value())
            .map_err(|e| ConfigError::type_error(e.to_string(), std::any::type_name::<T>()))
    }

    /// Pretty-printed JSON rendering of the tree
    pub fn as_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("<ERROR>: {e}"))
    }

    /// The node holding the last segment of `path` and the value stored
    /// there. Only reads; nothing is created along the way.
    fn lookup(&self, path: &str) -> Option<(Options, OptionValue)> {
        let (parents, last) = split_path(path);
        let mut owner = self.clone();
        if let Some(parents) = parents {
            for segment in parents.split('.') {
                let next = owner.map.read().get(segment).cloned();
                owner = owner.descend(next?)?;
            }
        }
        let value = owner.map.read().get(last).cloned()?;
        Some((owner, value))
    }

    /// Step from this node into `value`, following `@` references
    fn descend(&self, value: OptionValue) -> Option<Options> {
        match value {
            OptionValue::Node(child) => Some(Options {
                file_path: child.file_path.or_else(|| self.file_path.clone()),
                map: child.map,
            }),
            OptionValue::String(text) if text.starts_with('@') => {
                Some(self.load_reference(&text[1..]))
            }
            _ => None,
        }
    }

    fn load_reference(&self, name: &str) -> Options {
        let path = self.resolve_path(name);
        match Options::from_file(&path, Format::Auto) {
            Ok(options) => options,
            Err(err) => {
                tracing::debug!(
                    path = %path.display(),
                    error = %err,
                    "referenced options file could not be loaded"
                );
                Options::new()
            }
        }
    }
}

fn split_path(path: &str) -> (Option<&str>, &str) {
    match path.rsplit_once('.') {
        Some((parents, last)) => (Some(parents), last),
        None => (None, path),
    }
}

impl PartialEq for Options {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let left = self.map.read();
        let right = other.map.read();
        *left == *right
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.map.read().iter() {
            map.entry(k, v);
        }
        map.finish()
    }
}

impl FromStr for Options {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let options = Options::new();
        options.parse(s)?;
        Ok(options)
    }
}

impl From<OptionMap> for Options {
    fn from(map: OptionMap) -> Self {
        Options::from_map(map)
    }
}

impl<'de> Deserialize<'de> for Options {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Options::from_json(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Options {
        Options::from_json(json!({
            "db": {"host": "localhost", "port": 5432},
            "name": "svc"
        }))
        .unwrap()
    }

    #[test]
    fn get_navigates_nested_nodes() {
        let options = sample();
        assert_eq!(options.get("db").get_string("host", ""), "localhost");
        assert_eq!(options.get_int("db.port", 0), 5432);
    }

    #[test]
    fn get_of_missing_or_scalar_is_empty() {
        let options = sample();
        assert!(options.get("nope").is_empty());
        assert!(options.get("name").is_empty());
        assert!(options.get("db.host.deeper").is_empty());
    }

    #[test]
    fn sub_tree_is_shared() {
        let options = sample();
        let db = options.get("db");
        db.set("host", "10.0.0.1");
        assert_eq!(options.get_string("db.host", ""), "10.0.0.1");
        assert!(db.ptr_eq(&options.get("db")));
    }

    #[test]
    fn set_creates_and_replaces_intermediates() {
        let options = sample();
        assert_eq!(options.set("a.b.c", 1), None);
        assert_eq!(options.get_int("a.b.c", 0), 1);

        // "name" is a string, so it turns into a node
        options.set("name.first", "x");
        assert_eq!(options.get_string("name.first", ""), "x");

        let previous = options.set("db.port", 6543);
        assert_eq!(previous, Some(OptionValue::from(5432)));
    }

    #[test]
    fn reads_never_create_nodes() {
        let options = Options::new();
        assert!(options.get("x.y.z").is_empty());
        assert_eq!(options.get_object("x.y.z"), None);
        assert!(!options.exists("x.y"));
        assert_eq!(options.get_string("x.y.z", "fallback"), "fallback");
        assert!(options.is_empty());
    }

    #[test]
    fn writes_create_every_intermediate() {
        let options = Options::new();
        options.set("x.y.z", "v");
        assert_eq!(options.get_object("x.y.z"), Some(OptionValue::from("v")));
        assert_eq!(options.keys(), vec!["x"]);
        assert_eq!(options.get("x").keys(), vec!["y"]);
        assert!(options.get("x.y").exists("z"));
    }

    #[test]
    fn dotted_path_matches_stepwise_navigation() {
        let options = Options::from_json(json!({"a": {"b": {"c": 1}}})).unwrap();
        assert_eq!(options.get("a").get("b"), options.get("a.b"));
        assert!(options.get("a").get("b").ptr_eq(&options.get("a.b")));
        assert_eq!(options.get("a").get_object("b.c"), options.get_object("a.b.c"));
    }

    #[test]
    fn exists_and_remove() {
        let options = sample();
        assert!(options.exists("db.port"));
        assert!(!options.exists("db.user"));
        assert_eq!(options.remove("db.port"), Some(OptionValue::from(5432)));
        assert!(!options.exists("db.port"));
        assert_eq!(options.remove("missing.key"), None);
    }

    #[test]
    fn parse_replaces_content_and_clears_on_error() {
        let options = sample();
        options.parse("a=1;b=2").unwrap();
        assert_eq!(options.keys(), vec!["a", "b"]);

        assert!(options.parse("a=;").is_err());
        assert!(options.is_empty());
    }

    #[test]
    fn from_str_parses_escaped_text() {
        let options: Options = "user=admin;pass=p\\;w".parse().unwrap();
        assert_eq!(options.get_string("pass", ""), "p;w");
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn equality_is_structural() {
        let a = sample();
        let b = sample();
        assert_eq!(a, b);
        b.set("db.port", 1);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn deep_clone_is_independent() {
        let a = sample();
        let copy = a.deep_clone();
        a.set("db.host", "changed");
        assert_eq!(copy.get_string("db.host", ""), "localhost");
    }

    #[test]
    fn as_struct_decodes_camel_case() {
        #[derive(Deserialize, Debug, PartialEq)]
        #[serde(rename_all = "camelCase")]
        struct Db {
            host: String,
            port: u16,
            #[serde(default)]
            read_only: bool,
        }
        let db: Db = sample().get("db").as_struct().unwrap();
        assert_eq!(
            db,
            Db {
                host: "localhost".into(),
                port: 5432,
                read_only: false
            }
        );

        let err = sample().as_struct::<Db>().unwrap_err();
        assert!(matches!(err, ConfigError::TypeError { .. }));
    }

    #[test]
    fn resolve_path_uses_file_directory() {
        let options = Options::new().with_file_path("/etc/app/main.json");
        assert_eq!(
            options.resolve_path("db.json"),
            PathBuf::from("/etc/app/db.json")
        );
        assert_eq!(Options::new().resolve_path("db.json"), PathBuf::from("db.json"));
    }
}
