pub mod document;

pub use document::segmenter::{word_count, Segmenter};
pub use document::{
    load_document, read_prompt, read_text, resolve_input_path, IngestError,
    DEFAULT_INPUT_FILENAME,
};
