#![allow(clippy::missing_docs_in_private_items)]

pub mod pathname;
pub mod registry;

pub use registry::{CorpusInfo, MetadataRegistry};
