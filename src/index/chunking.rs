// src/index/chunking.rs
// Sliding-window fallback chunking for files the Python parser rejects.

pub const CHUNK_SIZE: usize = 1000;
pub const CHUNK_OVERLAP: usize = 150;

/// Split text into overlapping fixed-size windows. Boundaries are clamped to
/// char boundaries so multi-byte content never panics.
pub fn sliding_window_chunks(content: &str) -> Vec<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < content.len() {
        let end = floor_char_boundary(content, (start + CHUNK_SIZE).min(content.len()));
        let piece = content[start..end].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
        if end >= content.len() {
            break;
        }
        start = floor_char_boundary(content, end.saturating_sub(CHUNK_OVERLAP).max(start + 1));
    }
    chunks
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(sliding_window_chunks("").is_empty());
        assert!(sliding_window_chunks("   \n  ").is_empty());
    }

    #[test]
    fn short_input_is_one_chunk() {
        let chunks = sliding_window_chunks("hello world");
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn long_input_overlaps() {
        let text = "x".repeat(2500);
        let chunks = sliding_window_chunks(&text);
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.len() <= CHUNK_SIZE));
        // Overlap means total material exceeds the input length.
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        assert!(total > text.len());
    }

    #[test]
    fn multibyte_content_does_not_panic() {
        let text = "é".repeat(1200);
        let chunks = sliding_window_chunks(&text);
        assert!(!chunks.is_empty());
    }
}
