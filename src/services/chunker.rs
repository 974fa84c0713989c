use std::sync::LazyLock;

use regex::Regex;

use crate::db::models::document_chunk::Chunk;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_OVERLAP: usize = 50;

static BLANK_LINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("blank line pattern is valid"));

/// Unifies line endings, collapses blank-line runs to one blank line and trims.
pub fn normalize_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    BLANK_LINE_RUNS
        .replace_all(&unified, "\n\n")
        .trim()
        .to_string()
}

/// Split text into paragraph-aware chunks of at most `chunk_size` words.
///
/// Paragraphs are packed greedily. When the next paragraph would overflow the
/// current chunk, the chunk is emitted and the next one is seeded with its
/// last `overlap` words. Paragraphs longer than `chunk_size` are cut into
/// sliding windows that advance by `chunk_size - overlap` words.
///
/// Never fails: empty or whitespace-only text yields no chunks, and
/// `overlap >= chunk_size` is clamped so every window advances by at least
/// one word.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size - 1);
    let cleaned = normalize_text(text);

    let mut contents: Vec<String> = Vec::new();
    let mut buffer: Vec<String> = Vec::new();
    let mut buffered_words = 0;

    for paragraph in cleaned.split('\n').map(str::trim).filter(|p| !p.is_empty()) {
        let words: Vec<&str> = paragraph.split_whitespace().collect();

        if words.len() > chunk_size {
            if !buffer.is_empty() {
                contents.push(buffer.join("\n\n"));
                buffer.clear();
                buffered_words = 0;
            }
            contents.extend(sliding_windows(&words, chunk_size, overlap));
            continue;
        }

        if !buffer.is_empty() && buffered_words + words.len() > chunk_size {
            let flushed = buffer.join("\n\n");
            let seed = trailing_words(&flushed, overlap);
            contents.push(flushed);

            buffer.clear();
            buffered_words = 0;
            if !seed.is_empty() {
                buffered_words = seed.split_whitespace().count();
                buffer.push(seed);
            }
        }

        buffer.push(paragraph.to_string());
        buffered_words += words.len();
    }

    if !buffer.is_empty() {
        contents.push(buffer.join("\n\n"));
    }

    if contents.is_empty() && !cleaned.is_empty() {
        let words: Vec<&str> = cleaned.split_whitespace().collect();
        contents = sliding_windows(&words, chunk_size, overlap);
    }

    contents
        .into_iter()
        .enumerate()
        .map(|(index, content)| Chunk::new(content, index))
        .collect()
}

/// Windows of `size` words advancing by `size - overlap`; the last one may be short.
fn sliding_windows(words: &[&str], size: usize, overlap: usize) -> Vec<String> {
    let stride = size.saturating_sub(overlap).max(1);
    let mut windows = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let end = (start + size).min(words.len());
        windows.push(words[start..end].join(" "));

        if end >= words.len() {
            break;
        }

        start += stride;
    }

    windows
}

fn trailing_words(text: &str, count: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let take = count.min(words.len());
    words[words.len() - take..].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    fn paragraph(prefix: &str, n: usize) -> String {
        words(prefix, n).join(" ")
    }

    fn chunk_words(chunk: &Chunk) -> Vec<String> {
        chunk.content.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("", 500, 50).is_empty());
        assert!(chunk_text("  \n\r\n\t ", 500, 50).is_empty());
    }

    #[test]
    fn test_short_paragraphs_pack_into_one_chunk() {
        let text = format!(
            "{}\n\n{}\n\n{}",
            paragraph("a", 10),
            paragraph("b", 10),
            paragraph("c", 10)
        );
        let chunks = chunk_text(&text, 500, 50);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].page_number, 0);
        assert_eq!(chunks[0].content, text);
    }

    #[test]
    fn test_single_newlines_also_separate_paragraphs() {
        let chunks = chunk_text("first line\nsecond line\r\nthird line", 500, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "first line\n\nsecond line\n\nthird line");
    }

    #[test]
    fn test_oversized_paragraph_uses_sliding_windows() {
        let all = words("w", 1200);
        let chunks = chunk_text(&all.join(" "), 500, 50);

        assert_eq!(chunks.len(), 3);
        let sizes: Vec<usize> = chunks.iter().map(|c| c.word_count()).collect();
        assert_eq!(sizes, vec![500, 500, 300]);

        assert_eq!(chunk_words(&chunks[0])[0], "w0");
        assert_eq!(chunk_words(&chunks[1])[0], "w450");
        assert_eq!(chunk_words(&chunks[2])[0], "w900");
        assert_eq!(chunk_words(&chunks[2]).last().unwrap(), "w1199");

        let indices: Vec<usize> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_overflow_seeds_next_chunk_with_overlap() {
        let text = format!(
            "{}\n\n{}\n\n{}",
            paragraph("a", 300),
            paragraph("b", 300),
            paragraph("c", 300)
        );
        let chunks = chunk_text(&text, 500, 50);
        assert_eq!(chunks.len(), 3);

        for pair in chunks.windows(2) {
            let earlier = chunk_words(&pair[0]);
            let later = chunk_words(&pair[1]);
            let seed = 50.min(earlier.len());
            assert_eq!(&later[..seed], &earlier[earlier.len() - seed..]);
        }

        assert_eq!(chunks[1].word_count(), 350);
        assert_eq!(chunks[2].word_count(), 350);
        assert!(chunks[1].content.starts_with("a250 "));
        assert!(chunks[2].content.starts_with("b250 "));
    }

    #[test]
    fn test_packed_chunks_reconstruct_word_stream() {
        let text = format!(
            "{}\n\n{}\n\n{}",
            paragraph("a", 300),
            paragraph("b", 300),
            paragraph("c", 300)
        );
        let chunks = chunk_text(&text, 500, 50);

        let mut rebuilt = chunk_words(&chunks[0]);
        for chunk in &chunks[1..] {
            rebuilt.extend(chunk_words(chunk).into_iter().skip(50));
        }

        let original: Vec<String> = text.split_whitespace().map(String::from).collect();
        assert_eq!(rebuilt, original);

        for chunk in &chunks[1..] {
            assert!(chunk.word_count() - 50 <= 500);
        }
    }

    #[test]
    fn test_oversized_paragraph_flushes_buffer_without_seed() {
        let text = format!(
            "{}\n\n{}\n\n{}",
            paragraph("head", 10),
            paragraph("big", 1200),
            paragraph("tail", 10)
        );
        let chunks = chunk_text(&text, 500, 50);

        let sizes: Vec<usize> = chunks.iter().map(|c| c.word_count()).collect();
        assert_eq!(sizes, vec![10, 500, 500, 300, 10]);
        assert_eq!(chunks[4].content, paragraph("tail", 10));

        let indices: Vec<usize> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, (0..5).collect::<Vec<_>>());
    }

    #[test]
    fn test_zero_overlap_adds_no_seed() {
        let text = format!("{}\n\n{}", paragraph("a", 6), paragraph("b", 6));
        let chunks = chunk_text(&text, 10, 0);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].content, paragraph("b", 6));
    }

    #[test]
    fn test_overlap_limited_to_available_words() {
        let text = format!("{}\n\n{}", paragraph("a", 3), paragraph("b", 9));
        let chunks = chunk_text(&text, 10, 5);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].content, format!("a0 a1 a2\n\n{}", paragraph("b", 9)));
    }

    #[test]
    fn test_degenerate_options_still_terminate() {
        let text = paragraph("w", 20);
        let chunks = chunk_text(&text, 4, 10);
        assert!(!chunks.is_empty());
        assert_eq!(chunk_words(chunks.last().unwrap()).last().unwrap(), "w19");

        let chunks = chunk_text(&text, 0, 0);
        assert_eq!(chunks.len(), 20);
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let text = format!(
            "{}\n\n\n\n{}\r\n\r\n{}",
            paragraph("x", 120),
            paragraph("y", 700),
            paragraph("z", 40)
        );
        assert_eq!(chunk_text(&text, 200, 20), chunk_text(&text, 200, 20));
    }

    #[test]
    fn test_normalize_collapses_blank_runs() {
        assert_eq!(normalize_text("  a\r\n \r\n\r\nb\rc  "), "a\n\nb\nc");
    }
}
