//! Character-window text splitter.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TextSplitter {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive windows
    pub chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    /// Split text into overlapping chunks, trimmed, with empty chunks dropped.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();
        let mut chunks = Vec::new();

        if total_chars == 0 {
            return chunks;
        }

        let mut start = 0;

        while start < total_chars {
            let end = (start + self.chunk_size).min(total_chars);
            let window = &chars[start..end];

            // Try to break at sentence boundary
            let emitted = if end < total_chars {
                sentence_boundary(window)
            } else {
                window.len()
            };

            let final_text: String = window[..emitted].iter().collect();
            let trimmed = final_text.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }

            if end == total_chars {
                break;
            }
            // The next window overlaps what was emitted, not the full window.
            start += emitted.saturating_sub(self.chunk_overlap).max(1);
        }

        chunks
    }
}

/// Length of the window up to and including the last sentence ending (plus
/// its trailing whitespace) found in the final fifth.
fn sentence_boundary(window: &[char]) -> usize {
    let search_start = (window.len() * 80) / 100;

    for idx in (search_start..window.len()).rev() {
        let is_end = matches!(window[idx], '.' | '!' | '?');
        let followed_by_space = window
            .get(idx + 1)
            .map(|next| next.is_whitespace())
            .unwrap_or(false);
        if is_end && followed_by_space {
            return idx + 2;
        }
    }

    // No good boundary found, keep the whole window
    window.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_chunk() {
        let splitter = TextSplitter::new(500, 100);
        assert_eq!(splitter.split("  One sentence.  "), vec!["One sentence."]);
        assert!(splitter.split("").is_empty());
        assert!(splitter.split("   ").is_empty());
    }

    #[test]
    fn long_text_is_split_with_overlap() {
        let splitter = TextSplitter::new(100, 20);
        let text = "This is a test. ".repeat(20);
        let chunks = splitter.split(&text);

        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
        // Windows overlap, so the chunks together hold more text than the input.
        let total: usize = chunks.iter().map(|c| c.chars().count()).sum();
        assert!(total > text.trim().chars().count());
    }

    #[test]
    fn prefers_sentence_boundaries() {
        let splitter = TextSplitter::new(40, 5);
        let text = "Alpha beta gamma delta epsilon zeta. Eta theta iota kappa lambda mu nu.";
        let chunks = splitter.split(text);
        assert_eq!(chunks[0], "Alpha beta gamma delta epsilon zeta.");
    }

    #[test]
    fn early_sentence_cut_does_not_skip_text() {
        let splitter = TextSplitter::new(5000, 100);
        let text = format!("{}. {}{}", "a".repeat(4001), "MARKER".repeat(100), "b".repeat(6000));
        let chunks = splitter.split(&text);

        assert!(chunks[0].ends_with('.'));
        assert!(chunks.iter().any(|c| c.contains("MARKERMARKER")));
        assert!(chunks.iter().all(|c| c.chars().count() <= 5000));
    }

    #[test]
    fn every_word_lands_in_some_chunk() {
        let splitter = TextSplitter::new(200, 10);
        let text: String = (0..400)
            .map(|i| {
                if i % 7 == 0 {
                    format!("w{}. ", i)
                } else {
                    format!("w{} ", i)
                }
            })
            .collect();
        let chunks = splitter.split(&text);

        for i in 0..400 {
            let word = format!("w{}", i);
            let found = chunks.iter().any(|c| {
                c.split(|ch: char| ch.is_whitespace() || ch == '.')
                    .any(|token| token == word)
            });
            assert!(found, "{} is missing from every chunk", word);
        }
    }

    #[test]
    fn multibyte_text_does_not_panic() {
        let splitter = TextSplitter::new(10, 3);
        let text = "Élan vital — naïve café. ".repeat(5);
        let chunks = splitter.split(&text);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn overlap_is_clamped_below_chunk_size() {
        let splitter = TextSplitter::new(10, 50);
        assert_eq!(splitter.chunk_overlap, 9);
        assert!(!splitter.split(&"x".repeat(30)).is_empty());
    }
}
