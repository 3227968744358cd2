// THEORY:
// The codec turns binary PPM (`P6`) bytes into a `PixelBuffer` and back. It is pure and
// synchronous; file access lives in the thin `read_image` / `write_image` wrappers.
//
// Container layout:
//     P6\n
//     [# comment\n]*          (before the dimensions line or before the max-value line)
//     <width> <height>\n
//     [# comment\n]*
//     255\n
//     <width * height * 3 bytes, R,G,B, scanline order, no row padding>
//
// Comments are only recognised in the header. The body is raw bytes and is never
// scanned for `#`.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::core_modules::pixel::pixel::{Bytes, MAX_CHANNEL_VALUE, PixelBuffer};
use crate::error::{EdgeError, Result};

pub const FORMAT_TAG: &str = "P6";
const COMMENT_MARKER: u8 = b'#';

/// Splits one `\n`-terminated header line off the front of `input`.
/// Returns the line without its terminator (and without a trailing `\r`).
fn next_line<'a>(input: &mut &'a [u8]) -> Option<&'a [u8]> {
    let end = input.iter().position(|&b| b == b'\n')?;
    let line = &input[..end];
    *input = &input[end + 1..];
    Some(line.strip_suffix(b"\r").unwrap_or(line))
}

/// Next header line that is not a comment.
fn next_header_line<'a>(input: &mut &'a [u8], expecting: &str) -> Result<&'a [u8]> {
    loop {
        let line = next_line(input)
            .ok_or_else(|| EdgeError::Format(format!("header ended before the {expecting} line")))?;
        if line.first() != Some(&COMMENT_MARKER) {
            return Ok(line);
        }
    }
}

fn parse_dimensions(line: &[u8]) -> Result<(u32, u32)> {
    let malformed = || {
        EdgeError::Format(format!(
            "malformed dimensions line `{}`",
            String::from_utf8_lossy(line)
        ))
    };
    let text = std::str::from_utf8(line).map_err(|_| malformed())?;
    let mut fields = text.split_whitespace();
    let (Some(width), Some(height), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(malformed());
    };
    let width: u32 = width.parse().map_err(|_| malformed())?;
    let height: u32 = height.parse().map_err(|_| malformed())?;
    if width == 0 || height == 0 {
        return Err(EdgeError::Format(format!(
            "image dimensions must be non-zero, got {width}x{height}"
        )));
    }
    Ok((width, height))
}

fn check_max_value(line: &[u8]) -> Result<()> {
    let text = String::from_utf8_lossy(line);
    let found = text.trim();
    if found == MAX_CHANNEL_VALUE.to_string() {
        Ok(())
    } else {
        Err(EdgeError::Value {
            found: found.to_string(),
        })
    }
}

/// Decodes a binary PPM image.
///
/// Fails with `Format` for a wrong tag or malformed header, `Value` when the
/// max-channel-value is not 255, and `TruncatedInput` when the body is shorter than
/// `width * height * 3` bytes. Bytes after the body are ignored.
pub fn decode(bytes: &[u8]) -> Result<PixelBuffer> {
    let mut input = bytes;

    match next_line(&mut input) {
        Some(tag) if tag == FORMAT_TAG.as_bytes() => {}
        Some(tag) => {
            return Err(EdgeError::Format(format!(
                "expected `{FORMAT_TAG}` tag, found `{}`",
                String::from_utf8_lossy(tag)
            )));
        }
        None => return Err(EdgeError::Format(format!("missing `{FORMAT_TAG}` tag"))),
    }

    let (width, height) = parse_dimensions(next_header_line(&mut input, "dimensions")?)?;
    check_max_value(next_header_line(&mut input, "max-value")?)?;

    let expected = PixelBuffer::byte_len(width, height).ok_or_else(|| {
        EdgeError::Format(format!("image dimensions {width}x{height} are too large"))
    })?;
    if input.len() < expected {
        return Err(EdgeError::TruncatedInput {
            expected,
            actual: input.len(),
        });
    }

    let body: Bytes = input[..expected].to_vec();
    PixelBuffer::from_raw(width, height, body).ok_or_else(|| {
        EdgeError::Format(format!("image dimensions {width}x{height} are too large"))
    })
}

fn header(buffer: &PixelBuffer) -> String {
    format!(
        "{FORMAT_TAG}\n{} {}\n{MAX_CHANNEL_VALUE}\n",
        buffer.width(),
        buffer.height()
    )
}

/// Encodes `buffer` as a binary PPM image.
pub fn encode(buffer: &PixelBuffer) -> Bytes {
    let header = header(buffer);
    let mut bytes = Vec::with_capacity(header.len() + buffer.as_bytes().len());
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend_from_slice(buffer.as_bytes());
    bytes
}

/// Streams the encoded image into `sink`.
pub fn write_to<W: Write>(buffer: &PixelBuffer, mut sink: W) -> Result<()> {
    sink.write_all(header(buffer).as_bytes())
        .and_then(|_| sink.write_all(buffer.as_bytes()))
        .and_then(|_| sink.flush())
        .map_err(|source| EdgeError::io("writing encoded image", source))
}

pub fn read_image(path: &Path) -> Result<PixelBuffer> {
    let bytes = fs::read(path)
        .map_err(|source| EdgeError::io(format!("reading {}", path.display()), source))?;
    decode(&bytes)
}

/// Writes the encoded image to `path` in one call. A file left behind by a failed
/// write is removed.
pub fn write_image(buffer: &PixelBuffer, path: &Path) -> Result<()> {
    let bytes = encode(buffer);
    fs::write(path, bytes).map_err(|source| {
        let _ = fs::remove_file(path);
        EdgeError::io(format!("writing {}", path.display()), source)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::Pixel;

    fn ppm(header: &str, body: &[u8]) -> Vec<u8> {
        let mut bytes = header.as_bytes().to_vec();
        bytes.extend_from_slice(body);
        bytes
    }

    #[test]
    fn decodes_plain_header() {
        let body = [10, 20, 30, 40, 50, 60];
        let buffer = decode(&ppm("P6\n2 1\n255\n", &body)).expect("valid image");

        assert_eq!(buffer.dimensions(), (2, 1));
        assert_eq!(buffer.at(0), Pixel::new(10, 20, 30));
        assert_eq!(buffer.at(1), Pixel::new(40, 50, 60));
    }

    #[test]
    fn skips_comments_before_each_header_line() {
        let bytes = ppm(
            "P6\n# made by hand\n## another\n1 2\n# between\n255\n",
            &[1, 2, 3, 4, 5, 6],
        );
        let buffer = decode(&bytes).expect("comments are allowed in the header");

        assert_eq!(buffer.dimensions(), (1, 2));
        assert_eq!(buffer.get(0, 1), Pixel::new(4, 5, 6));
    }

    #[test]
    fn body_may_start_with_comment_marker() {
        let body = [b'#', b'\n', 0];
        let buffer = decode(&ppm("P6\n1 1\n255\n", &body)).expect("body is raw bytes");
        assert_eq!(buffer.at(0), Pixel::new(b'#', b'\n', 0));
    }

    #[test]
    fn tolerates_crlf_header() {
        let buffer = decode(&ppm("P6\r\n1 1\r\n255\r\n", &[9, 8, 7])).expect("crlf header");
        assert_eq!(buffer.at(0), Pixel::new(9, 8, 7));
    }

    #[test]
    fn rejects_wrong_tag() {
        let err = decode(&ppm("P3\n1 1\n255\n", &[0, 0, 0])).unwrap_err();
        assert!(matches!(err, EdgeError::Format(_)), "{err:?}");

        let err = decode(b"").unwrap_err();
        assert!(matches!(err, EdgeError::Format(_)), "{err:?}");
    }

    #[test]
    fn rejects_max_value_other_than_255() {
        let err = decode(&ppm("P6\n1 1\n200\n", &[0, 0, 0])).unwrap_err();
        assert!(matches!(err, EdgeError::Value { ref found } if found == "200"), "{err:?}");

        let err = decode(&ppm("P6\n1 1\nabc\n", &[0, 0, 0])).unwrap_err();
        assert!(matches!(err, EdgeError::Value { .. }), "{err:?}");

        // Numerically equal spellings are still not the literal `255`.
        for max_value in ["+255", "0255", "00255", "255.0"] {
            let err = decode(&ppm(&format!("P6\n1 1\n{max_value}\n"), &[1, 2, 3])).unwrap_err();
            assert!(
                matches!(err, EdgeError::Value { ref found } if found == max_value),
                "{max_value}: {err:?}"
            );
        }
    }

    #[test]
    fn max_value_allows_surrounding_whitespace() {
        let buffer = decode(&ppm("P6\n1 1\n 255 \n", &[1, 2, 3])).expect("trimmed 255");
        assert_eq!(buffer.at(0), Pixel::new(1, 2, 3));
    }

    #[test]
    fn rejects_malformed_dimensions() {
        for header in ["P6\n2\n255\n", "P6\n2 2 2\n255\n", "P6\nx 2\n255\n", "P6\n0 2\n255\n"] {
            let err = decode(&ppm(header, &[0; 12])).unwrap_err();
            assert!(matches!(err, EdgeError::Format(_)), "{header:?}: {err:?}");
        }
    }

    #[test]
    fn rejects_incomplete_header() {
        let err = decode(b"P6\n# only a comment\n").unwrap_err();
        assert!(matches!(err, EdgeError::Format(_)), "{err:?}");
    }

    #[test]
    fn reports_truncated_body() {
        let err = decode(&ppm("P6\n2 2\n255\n", &[0; 11])).unwrap_err();
        assert!(
            matches!(err, EdgeError::TruncatedInput { expected: 12, actual: 11 }),
            "{err:?}"
        );
    }

    #[test]
    fn ignores_trailing_bytes() {
        let buffer = decode(&ppm("P6\n1 1\n255\n", &[1, 2, 3, 4, 5])).expect("extra bytes");
        assert_eq!(buffer.as_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn encode_writes_canonical_header() {
        let buffer = PixelBuffer::from_pixels(2, 1, &[Pixel::WHITE, Pixel::BLACK]).unwrap();
        assert_eq!(
            encode(&buffer),
            ppm("P6\n2 1\n255\n", &[255, 255, 255, 0, 0, 0])
        );
    }

    #[test]
    fn encoded_image_decodes_to_same_buffer() {
        let buffer = PixelBuffer::from_fn(5, 3, |x, y| {
            Pixel::new((x * 40) as u8, (y * 90) as u8, (x * y) as u8)
        });
        assert_eq!(decode(&encode(&buffer)).unwrap(), buffer);
    }

    #[test]
    fn write_to_matches_encode() {
        let buffer = PixelBuffer::from_fn(3, 3, |x, y| Pixel::new(x as u8, y as u8, 0));
        let mut sink = Vec::new();
        write_to(&buffer, &mut sink).expect("vec sink never fails");
        assert_eq!(sink, encode(&buffer));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_image(&dir.path().join("absent.ppm")).unwrap_err();
        assert!(matches!(err, EdgeError::Io { .. }), "{err:?}");
    }
}
