pub mod pack;
pub mod text;

// Re-export the main chunking and packing entry points for external use
pub use pack::{MAX_CHARS_PER_PASSAGE, Passage, pack_context, truncate_text};
pub use text::{
    DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, TextChunk, TextChunker, chunk_text,
};
