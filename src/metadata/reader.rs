use img_parts::jpeg::Jpeg;
use img_parts::png::{Png, PngChunk};
use img_parts::webp::WebP;
use img_parts::{Bytes, ImageEXIF};
use std::fmt;

use crate::pipeline::ImageKind;

/// PNG text-chunk keyword used by ComfyUI for its workflow graph.
pub const KEYWORD_WORKFLOW: &str = "workflow";
/// PNG text-chunk keyword used by A1111-style tools for generation settings.
pub const KEYWORD_PARAMETERS: &str = "parameters";
/// PNG text-chunk keyword this tool writes; its presence marks a file as
/// already processed.
pub const KEYWORD_COMMENT: &str = "Comment";

const CHUNK_TEXT: [u8; 4] = *b"tEXt";
const CHUNK_ITXT: [u8; 4] = *b"iTXt";
const CHUNK_ZTXT: [u8; 4] = *b"zTXt";

/// EXIF tag IDs walked to reach the embedded comment in JPEG/WebP files.
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_USER_COMMENT: u16 = 0x9286; // 37510

/// Length of the character-encoding signature (e.g. `ASCII\0\0\0`) that
/// prefixes an EXIF UserComment payload.
const USER_COMMENT_HEADER_LEN: usize = 8;

/// Which embedded field held prior AI-generation metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKey {
    /// ComfyUI-style `workflow` field.
    Workflow,
    /// A1111-style `parameters` field (also used for EXIF UserComment data).
    Parameters,
}

impl MetadataKey {
    /// The exact field name used in the image container.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataKey::Workflow => KEYWORD_WORKFLOW,
            MetadataKey::Parameters => KEYWORD_PARAMETERS,
        }
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Embedded metadata extracted from an image container.
///
/// `key`/`value` carry prior AI-generation metadata to preserve;
/// `has_comment` is the idempotence marker — a `Comment` field means the
/// file has already been through the merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedMetadata {
    pub key: Option<MetadataKey>,
    pub value: Option<String>,
    pub has_comment: bool,
}

/// The container itself could not be parsed.
///
/// Callers are expected to log this and fall back to
/// [`EmbeddedMetadata::default`] — a broken metadata block must not stop the
/// merge. Malformed EXIF *within* a parseable container never surfaces here;
/// it simply yields no metadata.
#[derive(Debug, thiserror::Error)]
#[error("malformed {kind} container: {message}")]
pub struct ExtractionError {
    pub kind: ImageKind,
    pub message: String,
}

/// Extract embedded AI metadata from raw image file bytes.
pub fn extract_metadata(kind: ImageKind, bytes: &[u8]) -> Result<EmbeddedMetadata, ExtractionError> {
    match kind {
        ImageKind::Png => {
            let fields = png_text_fields(bytes)?;
            Ok(from_text_fields(&fields))
        }
        ImageKind::Jpeg => {
            let jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(bytes)).map_err(|e| {
                ExtractionError {
                    kind,
                    message: e.to_string(),
                }
            })?;
            Ok(from_exif_block(jpeg.exif()))
        }
        ImageKind::WebP => {
            let webp = WebP::from_bytes(Bytes::copy_from_slice(bytes)).map_err(|e| {
                ExtractionError {
                    kind,
                    message: e.to_string(),
                }
            })?;
            Ok(from_exif_block(webp.exif()))
        }
    }
}

/// Decode all textual chunks of a PNG into `(keyword, text)` pairs.
///
/// Handles `tEXt` (Latin-1) and uncompressed `iTXt` (UTF-8). Compressed
/// chunks are skipped — the generation tools this targets write
/// uncompressed text only.
pub fn png_text_fields(bytes: &[u8]) -> Result<Vec<(String, String)>, ExtractionError> {
    let png = Png::from_bytes(Bytes::copy_from_slice(bytes)).map_err(|e| ExtractionError {
        kind: ImageKind::Png,
        message: e.to_string(),
    })?;

    Ok(png
        .chunks()
        .iter()
        .filter_map(decode_text_chunk)
        .collect())
}

fn from_text_fields(fields: &[(String, String)]) -> EmbeddedMetadata {
    let lookup = |name: &str| {
        fields
            .iter()
            .find(|(keyword, _)| keyword == name)
            .map(|(_, text)| text.clone())
    };

    let mut meta = EmbeddedMetadata::default();
    // ComfyUI's workflow wins over A1111 parameters when both are present.
    if let Some(value) = lookup(KEYWORD_WORKFLOW) {
        meta.key = Some(MetadataKey::Workflow);
        meta.value = Some(value);
    } else if let Some(value) = lookup(KEYWORD_PARAMETERS) {
        meta.key = Some(MetadataKey::Parameters);
        meta.value = Some(value);
    }
    meta.has_comment = fields
        .iter()
        .any(|(keyword, _)| keyword == KEYWORD_COMMENT);
    meta
}

fn from_exif_block(block: Option<Bytes>) -> EmbeddedMetadata {
    let mut meta = EmbeddedMetadata::default();
    if let Some(tiff) = block {
        if let Some(comment) = user_comment(&tiff) {
            meta.key = Some(MetadataKey::Parameters);
            meta.value = Some(comment);
        }
    }
    meta
}

fn decode_text_chunk(chunk: &PngChunk) -> Option<(String, String)> {
    let data = chunk.contents();
    match chunk.kind() {
        CHUNK_TEXT => {
            let nul = data.iter().position(|&b| b == 0)?;
            Some((latin1(&data[..nul]), latin1(&data[nul + 1..])))
        }
        CHUNK_ITXT => decode_itxt(data),
        CHUNK_ZTXT => {
            log::debug!("skipping compressed zTXt chunk");
            None
        }
        _ => None,
    }
}

/// Decode an `iTXt` chunk: keyword, compression flag/method, language tag,
/// translated keyword, then UTF-8 text.
fn decode_itxt(data: &[u8]) -> Option<(String, String)> {
    let nul = data.iter().position(|&b| b == 0)?;
    let keyword = latin1(&data[..nul]);
    let rest = data.get(nul + 1..)?;
    if rest.len() < 2 {
        return None;
    }
    if rest[0] != 0 {
        log::debug!("skipping compressed iTXt chunk ({keyword})");
        return None;
    }
    let rest = &rest[2..];
    let lang_end = rest.iter().position(|&b| b == 0)?;
    let rest = rest.get(lang_end + 1..)?;
    let translated_end = rest.iter().position(|&b| b == 0)?;
    let text = rest.get(translated_end + 1..)?;
    Some((keyword, String::from_utf8_lossy(text).into_owned()))
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Walk a raw TIFF block (the EXIF payload of a JPEG/WebP) to the
/// UserComment tag and decode its text.
///
/// The payload is prefixed by an 8-byte encoding signature; anything no
/// longer than that carries no text. The remainder is decoded as UTF-8 with
/// lossy replacement and trimmed. Any structural problem — unknown byte
/// order, truncated IFDs, out-of-range offsets — yields `None` rather than
/// an error: malformed EXIF from third-party tools is expected.
pub(crate) fn user_comment(tiff: &[u8]) -> Option<String> {
    if tiff.len() < 8 {
        return None;
    }
    let big_endian = match &tiff[0..2] {
        b"MM" => true,
        b"II" => false,
        _ => return None,
    };

    let read_u16 = |offset: usize| -> Option<u16> {
        let b = tiff.get(offset..offset + 2)?;
        Some(if big_endian {
            u16::from_be_bytes([b[0], b[1]])
        } else {
            u16::from_le_bytes([b[0], b[1]])
        })
    };
    let read_u32 = |offset: usize| -> Option<u32> {
        let b = tiff.get(offset..offset + 4)?;
        Some(if big_endian {
            u32::from_be_bytes([b[0], b[1], b[2], b[3]])
        } else {
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        })
    };
    // An IFD is a u16 entry count followed by 12-byte entries; returns the
    // offset of the entry carrying `tag`.
    let find_entry = |ifd_offset: usize, tag: u16| -> Option<usize> {
        let count = read_u16(ifd_offset)? as usize;
        (0..count)
            .map(|i| ifd_offset + 2 + i * 12)
            .find(|&entry| read_u16(entry) == Some(tag))
    };

    let ifd0 = read_u32(4)? as usize;
    let exif_pointer = find_entry(ifd0, TAG_EXIF_IFD)?;
    let exif_ifd = read_u32(exif_pointer + 8)? as usize;
    let entry = find_entry(exif_ifd, TAG_USER_COMMENT)?;

    let format = read_u16(entry + 2)?;
    let count = read_u32(entry + 4)? as usize;
    let len = count.checked_mul(component_size(format)?)?;
    // Values up to 4 bytes are stored inline; longer ones behind an offset.
    let start = if len <= 4 {
        entry + 8
    } else {
        read_u32(entry + 8)? as usize
    };
    let payload = tiff.get(start..start.checked_add(len)?)?;

    if payload.len() <= USER_COMMENT_HEADER_LEN {
        return None;
    }
    let text = String::from_utf8_lossy(&payload[USER_COMMENT_HEADER_LEN..]);
    Some(text.trim().to_string())
}

/// Byte size of one component for a TIFF data format code.
fn component_size(format: u16) -> Option<usize> {
    match format {
        1 | 2 | 6 | 7 => Some(1),
        3 | 8 => Some(2),
        4 | 9 | 11 => Some(4),
        5 | 10 | 12 => Some(8),
        _ => None,
    }
}
