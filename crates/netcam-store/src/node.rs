//! Hierarchical key/value nodes on top of the filesystem.
//!
//! A node is a directory. Its child nodes are subdirectories and its typed
//! values live together in `values.json`. Value writes replace the whole file
//! atomically; anything larger than one node has no atomicity guarantee.

use crate::fsync_dir;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const VALUES_FILE: &str = "values.json";

/// A typed value stored under a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Sz(String),
    Dword(u32),
}

/// All values of one node, keyed by value name. `""` is the default value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(BTreeMap<String, Value>);

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: Value) -> &mut Self {
        self.0.insert(name.to_owned(), value);
        self
    }

    pub fn set_sz(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.set(name, Value::Sz(value.into()))
    }

    pub fn set_dword(&mut self, name: &str, value: u32) -> &mut Self {
        self.set(name, Value::Dword(value))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// String value, or `None` when absent or stored with another type.
    pub fn sz(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(Value::Sz(s)) => Some(s),
            _ => None,
        }
    }

    /// 32-bit value, or `None` when absent or stored with another type.
    pub fn dword(&self, name: &str) -> Option<u32> {
        match self.0.get(name) {
            Some(Value::Dword(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    path: PathBuf,
}

impl Node {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn child(&self, name: &str) -> Node {
        Node::open(self.path.join(name))
    }

    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }

    /// Create this node and any missing ancestors.
    pub fn create(&self) -> io::Result<()> {
        fs::create_dir_all(&self.path)
    }

    /// Names of the child nodes, in directory enumeration order.
    pub fn children(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => {
                    tracing::warn!("skipping node with non UTF-8 name: {}", raw.to_string_lossy());
                }
            }
        }
        Ok(names)
    }

    /// Read all values. A node without a values file has no values.
    pub fn values(&self) -> io::Result<Values> {
        match fs::read(self.path.join(VALUES_FILE)) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Values::new()),
            Err(e) => Err(e),
        }
    }

    /// Replace all values of this node atomically. The node must exist.
    pub fn write_values(&self, values: &Values) -> io::Result<()> {
        let content = serde_json::to_vec_pretty(values)?;
        let mut tmp = NamedTempFile::new_in(&self.path)?;
        tmp.write_all(&content)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path.join(VALUES_FILE))
            .map_err(|e| e.error)?;
        fsync_dir(&self.path)
    }

    /// Set a single value, keeping the others.
    pub fn set_value(&self, name: &str, value: Value) -> io::Result<()> {
        let mut values = self.values()?;
        values.set(name, value);
        self.write_values(&values)
    }

    /// Delete this node with all of its values and children. Missing nodes are fine.
    pub fn delete_tree(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
