use image::DynamicImage;
use img_parts::Bytes;
use img_parts::png::{Png, PngChunk};
use std::io::Cursor;
use std::path::{Path, PathBuf};

const CHUNK_TEXT: [u8; 4] = *b"tEXt";
const CHUNK_ITXT: [u8; 4] = *b"iTXt";
const CHUNK_IMAGE_DATA: [u8; 4] = *b"IDAT";

/// Failure while producing the output PNG.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
    #[error("encoder produced an unparseable PNG container: {0}")]
    Container(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Re-encode pixel data as PNG, splice `fields` in as text chunks, and write
/// the result to `path`.
///
/// Fields are written in order, ahead of the image data. Keywords and values
/// that fit Latin-1 become `tEXt` chunks; anything else becomes an
/// uncompressed `iTXt` chunk — the same split the tools that consume these
/// files expect.
pub fn write_png_with_text(
    image: &DynamicImage,
    fields: &[(String, String)],
    path: &Path,
) -> Result<(), WriteError> {
    let mut encoded = Vec::new();
    image.write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Png)?;

    let mut png =
        Png::from_bytes(encoded.into()).map_err(|e| WriteError::Container(e.to_string()))?;

    // Text chunks go before the first IDAT, after the header chunks the
    // encoder emitted.
    let insert_at = png
        .chunks()
        .iter()
        .position(|chunk| chunk.kind() == CHUNK_IMAGE_DATA)
        .unwrap_or(1);
    for (i, (keyword, value)) in fields.iter().enumerate() {
        png.chunks_mut().insert(insert_at + i, text_chunk(keyword, value));
    }

    let output = png.encoder().bytes();
    std::fs::write(path, &output).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn text_chunk(keyword: &str, value: &str) -> PngChunk {
    if is_latin1(keyword) && is_latin1(value) {
        // tEXt: keyword, NUL, Latin-1 text
        let mut contents = Vec::with_capacity(keyword.len() + 1 + value.len());
        contents.extend(latin1_bytes(keyword));
        contents.push(0);
        contents.extend(latin1_bytes(value));
        PngChunk::new(CHUNK_TEXT, Bytes::from(contents))
    } else {
        // iTXt: keyword, NUL, compression flag + method, empty language tag
        // and translated keyword, UTF-8 text
        let mut contents = Vec::with_capacity(keyword.len() + 5 + value.len());
        contents.extend(latin1_bytes(keyword));
        contents.push(0);
        contents.push(0); // uncompressed
        contents.push(0); // compression method
        contents.push(0); // language tag terminator
        contents.push(0); // translated keyword terminator
        contents.extend_from_slice(value.as_bytes());
        PngChunk::new(CHUNK_ITXT, Bytes::from(contents))
    }
}

fn is_latin1(s: &str) -> bool {
    s.chars().all(|c| (c as u32) <= 0xFF)
}

fn latin1_bytes(s: &str) -> impl Iterator<Item = u8> + '_ {
    s.chars().map(|c| c as u8)
}
