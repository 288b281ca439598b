//! Input/output plumbing: encoding resolution, stdin/stdout routing, and
//! transcoded readers/writers.
//!
//! Legacy exports frequently arrive in single-byte encodings, so every
//! subcommand accepts `--input-encoding`/`--output-encoding` labels resolved
//! through `encoding_rs`. Input is decoded to UTF-8 while streaming via
//! `encoding_rs_io`; output is re-encoded on the fly when a non-UTF-8
//! encoding is requested. The `-` path convention routes through the
//! standard streams.

use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use encoding_rs_io::DecodeReaderBytesBuilder;

/// Record files are semicolon-delimited unless overridden.
pub const DEFAULT_DELIMITER: u8 = b';';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_delimiter(provided: Option<u8>) -> char {
    provided.unwrap_or(DEFAULT_DELIMITER) as char
}

/// Opens an input file (or stdin for `-`) decoded from `encoding` to UTF-8.
pub fn open_input(path: &Path, encoding: &'static Encoding) -> Result<Box<dyn BufRead>> {
    let raw: Box<dyn io::Read> = if is_dash(path) {
        Box::new(io::stdin().lock())
    } else {
        Box::new(File::open(path).with_context(|| format!("Opening input file {path:?}"))?)
    };
    let decoded = DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding))
        .build(raw);
    Ok(Box::new(BufReader::new(decoded)))
}

/// Opens an output file (or stdout when `path` is `None`/`-`), transcoding
/// from UTF-8 to `encoding` when needed.
pub fn open_output(path: Option<&Path>, encoding: &'static Encoding) -> Result<Box<dyn Write>> {
    let base: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(io::stdout()),
    };
    if encoding == UTF_8 {
        Ok(base)
    } else {
        Ok(Box::new(TranscodingWriter::new(base, encoding)))
    }
}

/// Buffers written bytes until they form complete UTF-8, then re-encodes.
struct TranscodingWriter<W: Write> {
    inner: W,
    encoding: &'static Encoding,
    buffer: Vec<u8>,
}

impl<W: Write> TranscodingWriter<W> {
    fn new(inner: W, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            encoding,
            buffer: Vec::new(),
        }
    }

    fn drain_buffer(&mut self, force: bool) -> io::Result<()> {
        while !self.buffer.is_empty() {
            match std::str::from_utf8(&self.buffer) {
                Ok(text) => {
                    let text = text.to_owned();
                    self.encode_and_write(&text)?;
                    self.buffer.clear();
                }
                Err(err) => {
                    if err.error_len().is_some() {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "Invalid UTF-8 sequence in output stream",
                        ));
                    }
                    let valid_up_to = err.valid_up_to();
                    if valid_up_to > 0 {
                        let text = std::str::from_utf8(&self.buffer[..valid_up_to])
                            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
                            .to_owned();
                        self.encode_and_write(&text)?;
                        self.buffer.drain(..valid_up_to);
                        continue;
                    }
                    // Incomplete trailing sequence; wait for more bytes.
                    if force {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "Incomplete UTF-8 sequence at end of output stream",
                        ));
                    }
                    break;
                }
            }
        }
        Ok(())
    }

    fn encode_and_write(&mut self, text: &str) -> io::Result<()> {
        let (encoded, _, had_errors) = self.encoding.encode(text);
        if had_errors {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to encode text using {}", self.encoding.name()),
            ));
        }
        self.inner.write_all(encoded.as_ref())
    }
}

impl<W: Write> Write for TranscodingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.drain_buffer(false)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.drain_buffer(true)?;
        self.inner.flush()
    }
}
