//! Embedded-metadata extraction and PNG text-chunk writing.
//!
//! This module provides the two halves of the merge engine's metadata work:
//!
//! - [`extract_metadata`] — Read the AI-generation metadata already embedded
//!   in a PNG/JPEG/WebP container (plus the `Comment` marker that flags a
//!   previously processed file)
//! - [`write_png_with_text`] — Re-encode pixel data as PNG and splice a set
//!   of text fields in as `tEXt`/`iTXt` chunks
//!
//! Extraction dispatches on [`ImageKind`](crate::pipeline::ImageKind): PNG
//! containers are read chunk-by-chunk, JPEG and WebP go through their raw
//! EXIF block and a TIFF walk to the UserComment tag.

mod reader;
mod writer;

pub use reader::{
    EmbeddedMetadata, ExtractionError, MetadataKey, extract_metadata, png_text_fields,
    KEYWORD_COMMENT, KEYWORD_PARAMETERS, KEYWORD_WORKFLOW,
};
pub use writer::{WriteError, write_png_with_text};
