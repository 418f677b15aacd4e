//! Paragraph-respecting document segmentation.
//!
//! Splits a document on blank lines and greedily packs paragraphs into
//! segments of at most `max_words` words. A paragraph is only broken apart
//! when it cannot fit in any segment by itself; its words are then grouped
//! into runs of `max_words`, with the trailing partial run seeding the next
//! segment.

use tracing::debug;

/// Separator between paragraphs, and the suffix of every emitted segment.
const PARAGRAPH_BREAK: &str = "\n\n";

/// Whitespace-delimited word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Splits documents into word-bounded segments.
#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    max_words: usize,
}

impl Segmenter {
    /// A ceiling of 0 is treated as 1.
    pub fn new(max_words: usize) -> Self {
        Self {
            max_words: max_words.max(1),
        }
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    /// Split `document` into ordered segments.
    ///
    /// Each segment is its paragraphs joined by a blank line, followed by a
    /// trailing blank line. Segments that would contain no words at all
    /// (only empty or whitespace paragraphs) are not emitted.
    pub fn split(&self, document: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut acc = Accumulator::default();

        for paragraph in document.split(PARAGRAPH_BREAK) {
            let words = word_count(paragraph);

            if acc.words + words > self.max_words && !acc.is_empty() {
                acc.flush_into(&mut out);
            }

            if words > self.max_words {
                acc.flush_into(&mut out);

                let tokens: Vec<&str> = paragraph.split_whitespace().collect();
                let mut groups = tokens.chunks(self.max_words).peekable();
                while let Some(group) = groups.next() {
                    if groups.peek().is_some() {
                        let mut segment = group.join(" ");
                        segment.push_str(PARAGRAPH_BREAK);
                        out.push(segment);
                    } else {
                        acc.push(group.join(" "), group.len());
                    }
                }
            } else {
                acc.push(paragraph.to_string(), words);
            }
        }
        acc.flush_into(&mut out);

        debug!(
            segments = out.len(),
            max_words = self.max_words,
            "Document segmented"
        );
        out
    }
}

/// Paragraphs collected for the segment under construction.
#[derive(Debug, Default)]
struct Accumulator {
    paragraphs: Vec<String>,
    words: usize,
}

impl Accumulator {
    fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    fn push(&mut self, paragraph: String, words: usize) {
        self.paragraphs.push(paragraph);
        self.words += words;
    }

    fn flush_into(&mut self, out: &mut Vec<String>) {
        if self.words > 0 {
            let mut segment = self.paragraphs.join(PARAGRAPH_BREAK);
            segment.push_str(PARAGRAPH_BREAK);
            out.push(segment);
        }
        self.paragraphs.clear();
        self.words = 0;
    }
}
