use common::error::AppError;
use uuid::Uuid;

/// The root namespace only exists logically; it has the reserved empty name
/// and a fixed id.
pub const ROOT_ID: Uuid = Uuid::nil();
pub const ROOT_NAME: &str = "";

pub const NAMESPACE_SEPARATOR: char = '.';

// Corpus pathnames look like "xxx.yyy.zzz:corpus_name"; root level corpora
// still look like ":corpus_name".
pub const CORPUS_SEPARATOR: char = ':';

pub const MAX_PATHNAME_LENGTH: usize = 256;
pub const MAX_SEGMENT_LENGTH: usize = 32;

/// A single name segment: alphanumeric plus underscore, shorter than a
/// segment slot (one character is reserved for the separator).
pub fn is_name_valid(name: &str) -> bool {
    !name.is_empty()
        && name.len() < MAX_SEGMENT_LENGTH
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn is_namespace_pathname_valid(pathname: &str) -> bool {
    if pathname.is_empty() || pathname.len() > MAX_PATHNAME_LENGTH {
        return false;
    }
    pathname.split(NAMESPACE_SEPARATOR).all(is_name_valid)
}

pub fn is_corpus_pathname_valid(pathname: &str) -> bool {
    if pathname.len() > MAX_PATHNAME_LENGTH {
        return false;
    }
    let Some((namespace_pathname, corpus_name)) = pathname.split_once(CORPUS_SEPARATOR) else {
        return false;
    };
    if !is_name_valid(corpus_name) {
        return false;
    }
    namespace_pathname == ROOT_NAME || is_namespace_pathname_valid(namespace_pathname)
}

/// Parses a namespace pathname into parent pathname and child name (NOT
/// pathname). Top-level namespaces have the root as parent.
pub fn split_namespace_pathname(pathname: &str) -> Result<(String, String), AppError> {
    if !is_namespace_pathname_valid(pathname) {
        return Err(AppError::IllegalName(pathname.to_owned()));
    }
    match pathname.rsplit_once(NAMESPACE_SEPARATOR) {
        Some((parent, name)) => Ok((parent.to_owned(), name.to_owned())),
        None => Ok((ROOT_NAME.to_owned(), pathname.to_owned())),
    }
}

/// Parses a corpus pathname into parent namespace pathname and corpus name.
pub fn split_corpus_pathname(pathname: &str) -> Result<(String, String), AppError> {
    if !is_corpus_pathname_valid(pathname) {
        return Err(AppError::IllegalName(pathname.to_owned()));
    }
    let (parent, name) = pathname
        .split_once(CORPUS_SEPARATOR)
        .ok_or_else(|| AppError::IllegalName(pathname.to_owned()))?;
    Ok((parent.to_owned(), name.to_owned()))
}

pub fn mangle_corpus_pathname(parent_pathname: &str, corpus_name: &str) -> String {
    format!("{parent_pathname}{CORPUS_SEPARATOR}{corpus_name}")
}

/// Composite "{namespace_id}:{corpus_id}" reference used inside a
/// namespace's default query set.
pub fn compose_corpus_ref(namespace_id: Uuid, corpus_id: Uuid) -> String {
    format!("{namespace_id}{CORPUS_SEPARATOR}{corpus_id}")
}

pub fn parse_corpus_ref(reference: &str) -> Option<(Uuid, Uuid)> {
    let (namespace, corpus) = reference.split_once(CORPUS_SEPARATOR)?;
    Some((
        Uuid::parse_str(namespace).ok()?,
        Uuid::parse_str(corpus).ok()?,
    ))
}
