#![forbid(unsafe_code)]

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to read from stdin: {0}")]
    Stdin(#[source] std::io::Error),
    #[error("failed to read file {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode base64 input")]
    Base64Decode,
    #[error("input {0:?} matches a file on disk but is missing '@' prefix; to read from file, use '@{0}'")]
    MissingAtPrefix(String),
}

/// Resolve an input specifier to raw bytes.
///
/// `-` reads stdin to end, `@path` reads a file, a `base64:` prefix forces
/// base64 decoding of the remainder, and anything else is a literal payload.
/// A bare specifier that names an existing regular file is rejected so a
/// forgotten `@` never silently turns a filename into literal data.
pub fn read(input: &str, is_base64: bool) -> Result<Vec<u8>, ReadError> {
    let mut force_base64 = is_base64;

    let raw: Vec<u8> = if input == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(ReadError::Stdin)?;
        buf
    } else if let Some(path) = input.strip_prefix('@') {
        std::fs::read(path).map_err(|source| ReadError::File {
            path: path.to_string(),
            source,
        })?
    } else {
        if Path::new(input).is_file() {
            return Err(ReadError::MissingAtPrefix(input.to_string()));
        }

        let literal = match input.strip_prefix("base64:") {
            Some(rest) => {
                force_base64 = true;
                rest
            }
            None => input,
        };

        // Autodetect base64 literals, but only when long enough or padded
        // so short words like "root" stay literal.
        if !force_base64 && !literal.is_empty() {
            if let Ok(decoded) = STANDARD.decode(literal) {
                if literal.len() > 16 || literal.ends_with('=') {
                    return Ok(decoded);
                }
            }
        }

        literal.as_bytes().to_vec()
    };

    if force_base64 {
        return STANDARD
            .decode(&raw)
            .or_else(|_| URL_SAFE.decode(&raw))
            .map_err(|_| ReadError::Base64Decode);
    }

    Ok(raw)
}

/// Encode binary data for printing, optionally as standard base64.
pub fn encode(data: &[u8], as_base64: bool) -> String {
    if as_base64 {
        STANDARD.encode(data)
    } else {
        String::from_utf8_lossy(data).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn literal_string_is_returned_verbatim() {
        assert_eq!(read("hello", false).unwrap(), b"hello");
    }

    #[test]
    fn file_reference_reads_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        let spec = format!("@{}", file.path().display());
        assert_eq!(read(&spec, false).unwrap(), b"hello world");
    }

    #[test]
    fn missing_at_prefix_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"contents").unwrap();
        let spec = file.path().display().to_string();
        assert!(matches!(
            read(&spec, false),
            Err(ReadError::MissingAtPrefix(_))
        ));
    }

    #[test]
    fn explicit_base64_prefix_decodes() {
        let spec = format!("base64:{}", STANDARD.encode(b"hello world"));
        assert_eq!(read(&spec, false).unwrap(), b"hello world");
    }

    #[test]
    fn base64_flag_decodes() {
        let encoded = STANDARD.encode(b"hello world");
        assert_eq!(read(&encoded, true).unwrap(), b"hello world");
    }

    #[test]
    fn base64_flag_falls_back_to_url_safe() {
        let encoded = URL_SAFE.encode(&[0xfb, 0xff, 0xfe, 0x01]);
        assert_eq!(read(&encoded, true).unwrap(), vec![0xfb, 0xff, 0xfe, 0x01]);
    }

    #[test]
    fn base64_flag_rejects_garbage() {
        assert!(matches!(
            read("not!!valid@@base64", true),
            Err(ReadError::Base64Decode)
        ));
    }

    #[test]
    fn autodetect_decodes_long_base64_literal() {
        let encoded = STANDARD.encode(b"hello world long enough");
        assert_eq!(read(&encoded, false).unwrap(), b"hello world long enough");
    }

    #[test]
    fn autodetect_skips_short_unpadded_literal() {
        assert_eq!(read("root", false).unwrap(), b"root");
    }

    #[test]
    fn autodetect_accepts_short_padded_literal() {
        let encoded = STANDARD.encode(b"hello");
        assert!(encoded.ends_with('='));
        assert_eq!(read(&encoded, false).unwrap(), b"hello");
    }

    #[test]
    fn encode_round_trips_base64() {
        assert_eq!(encode(b"hello", true), STANDARD.encode(b"hello"));
        assert_eq!(encode(b"hello", false), "hello");
    }
}
