pub mod citation_store;
pub mod db;
pub mod document_store;
pub mod indexes;
pub mod types;
pub mod vector_store;
