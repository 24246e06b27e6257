//! Source-type classification and the per-type text cleaning policy.
//!
//! Prose formats get a deliberately lossy normalization: everything
//! outside `[A-Za-z0-9]` and whitespace is dropped and whitespace runs
//! collapse to a single space, which stabilizes tokenization for
//! similarity retrieval. All other formats pass through untouched.

use std::path::Path;

use crate::models::SourceType;

/// Extensions whose content is natural-language prose.
const PROSE_EXTENSIONS: [&str; 4] = ["pdf", "docx", "pptx", "txt"];

/// Classify a file by extension.
pub fn classify(file_path: &str) -> SourceType {
    let ext = Path::new(file_path)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if PROSE_EXTENSIONS.contains(&ext.as_str()) {
        SourceType::Prose
    } else {
        SourceType::Structured
    }
}

/// Apply the cleaning policy for `file_path` to `raw_text`.
///
/// Pure function of its two inputs; empty input yields an empty string.
pub fn normalize(file_path: &str, raw_text: &str) -> String {
    match classify(file_path) {
        SourceType::Prose => {
            let kept: String = raw_text
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
                .collect();
            kept.split_whitespace().collect::<Vec<_>>().join(" ")
        }
        SourceType::Structured => raw_text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prose_strips_punctuation_and_collapses_whitespace() {
        let out = normalize("notes.txt", "The cat sat on the mat.  The dog\n\nran fast!");
        assert_eq!(out, "The cat sat on the mat The dog ran fast");
    }

    #[test]
    fn prose_output_is_alphanumeric_and_single_spaced() {
        let out = normalize(
            "slides.pptx",
            "Heading: *emphasis*, (parens) — dashes … and 42%.",
        );
        assert!(out
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' '));
        assert!(!out.contains("  "));
    }

    #[test]
    fn structured_text_is_identity() {
        let code = "def add(a, b):\n    return a + b\n";
        assert_eq!(normalize("util.py", code), code);
    }

    #[test]
    fn empty_input_returns_empty() {
        assert_eq!(normalize("empty.txt", ""), "");
        assert_eq!(normalize("empty.py", ""), "");
    }

    #[test]
    fn classification_by_extension() {
        assert_eq!(classify("report.PDF"), SourceType::Prose);
        assert_eq!(classify("deck.pptx"), SourceType::Prose);
        assert_eq!(classify("readme.txt"), SourceType::Prose);
        assert_eq!(classify("main.rs"), SourceType::Structured);
        assert_eq!(classify("notebook.ipynb"), SourceType::Structured);
        assert_eq!(classify("no_extension"), SourceType::Structured);
    }
}
