#![allow(clippy::missing_docs_in_private_items)]

pub mod corpus;
pub mod deletion;
pub mod fusion;
pub mod searching;

pub use corpus::{Corpus, CorpusStores};
pub use fusion::ScoredHit;
pub use searching::{group_by_corpus_type, multi_corpus_search};
