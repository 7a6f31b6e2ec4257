// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct Cases<T> {
    pub cases: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct QhatCase {
    pub name: String,
    pub series: Vec<f64>,
    pub expected: Vec<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ArgMaxCase {
    pub name: String,
    pub values: Vec<f64>,
    pub index: usize,
    pub value: f64,
}

#[derive(Debug, Deserialize)]
pub struct EDivisiveCase {
    pub name: String,
    pub series: Vec<f64>,
    pub significance: f64,
    pub permutations: usize,
    /// Indices in acceptance order.
    pub expected: Vec<usize>,
}

#[derive(Debug, Deserialize)]
pub struct EdmCase {
    pub name: String,
    pub series: Vec<f64>,
    pub min_size: usize,
    pub expected: Vec<usize>,
}

pub fn testdata_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join(format!("{name}.json"))
}

/// Reads `testdata/<name>.json` into `T`.
pub fn load<T: DeserializeOwned>(name: &str) -> T {
    let path = testdata_path(name);
    let raw = std::fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("fixture {} should be readable: {err}", path.display()));
    serde_json::from_str(&raw)
        .unwrap_or_else(|err| panic!("fixture {} should parse: {err}", path.display()))
}
