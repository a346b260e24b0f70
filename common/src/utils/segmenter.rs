use text_splitter::{ChunkConfig, TextSplitter};

/// A contiguous slice of a document with its character span. Segments cover
/// the input exactly: `end` of one segment is `start` of the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Split a document into pieces no longer than `max_chars` characters,
/// preferring paragraph breaks, then sentence boundaries, then whitespace,
/// then a hard cut. Trimming is disabled so the concatenation of all
/// segments reproduces the input character for character.
pub fn segment(text: &str, max_chars: usize) -> Vec<String> {
    segment_with_offsets(text, max_chars)
        .into_iter()
        .map(|segment| segment.text)
        .collect()
}

/// Like [`segment`], but each piece carries its character span into the
/// original document.
pub fn segment_with_offsets(text: &str, max_chars: usize) -> Vec<TextSegment> {
    if text.is_empty() {
        return Vec::new();
    }

    let config = ChunkConfig::new(max_chars.max(1)).with_trim(false);
    let splitter = TextSplitter::new(config);

    let mut segments = Vec::new();
    let mut start = 0usize;
    for chunk in splitter.chunks(text) {
        let char_count = chunk.chars().count();
        segments.push(TextSegment {
            text: chunk.to_owned(),
            start,
            end: start + char_count,
        });
        start += char_count;
    }
    segments
}
