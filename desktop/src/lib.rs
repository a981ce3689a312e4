//! Host-side pieces of asset-io: the std filesystem provider used by the
//! `assetio` tool.

pub mod std_fs;
