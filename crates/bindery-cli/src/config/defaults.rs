use std::path::PathBuf;

use bindery_graph::manifest::strategy::DEFAULT_SHARED_PREFIX;

pub fn default_root() -> PathBuf {
    PathBuf::from(".")
}

pub fn default_out_dir() -> PathBuf {
    PathBuf::from("dist")
}

pub fn default_min_entrypoints() -> usize {
    2
}

pub fn default_shared_bundle_prefix() -> String {
    DEFAULT_SHARED_PREFIX.to_string()
}
