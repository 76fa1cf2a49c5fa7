use crate::error::AppError;

/// Splits text into overlapping windows of `size` characters, advancing by
/// `size - overlap` per window.
///
/// Boundaries are counted in characters and sliced on UTF-8 boundaries. The
/// final window keeps whatever tail remains, never padded and never dropped.
/// The same input and configuration always produce identical boundaries,
/// which keeps chunk sequence indexes (and the record ids derived from
/// them) stable across re-indexing.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>, AppError> {
    if size == 0 {
        return Err(AppError::Validation(
            "chunk size must be greater than zero".into(),
        ));
    }
    if overlap >= size {
        return Err(AppError::Validation(format!(
            "chunk overlap ({overlap}) must be smaller than chunk size ({size})"
        )));
    }
    if text.is_empty() {
        return Ok(Vec::new());
    }

    // Byte offsets of every character boundary, with the end appended so a
    // window's end index always has a valid slice position.
    let mut boundaries: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
    boundaries.push(text.len());
    let char_count = boundaries.len() - 1;

    let step = size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < char_count {
        let end = usize::min(start + size, char_count);
        chunks.push(text[boundaries[start]..boundaries[end]].to_owned());
        start += step;
    }

    Ok(chunks)
}

/// Chunking rule for summary narration: windows sized at 20% of the text
/// with an overlap of 0.1% of the original length. Keeps each narration
/// call's context bounded regardless of transcript size.
///
/// The 0.1% overlap is deliberately thin; a segment only needs a few
/// trailing characters of its predecessor for continuity. Widen it here
/// if narrations start reading as disjointed.
pub fn narration_chunks(text: &str) -> Result<Vec<String>, AppError> {
    let char_count = text.chars().count();
    let size = usize::max(1, char_count / 5);
    let mut overlap = char_count / 1000;
    if overlap >= size {
        overlap = 0;
    }
    chunk_text(text, size, overlap)
}
