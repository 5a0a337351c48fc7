//! Named compression codecs, wrapped as byte-stream transforms.
//!
//! The pipeline never looks inside a codec: it asks for a decompressing
//! reader over compressed bytes, or for the compressed form of a buffer.

use std::fmt;
use std::io::{self, Read, Write};

use log::trace;

use crate::error::BitstatError;

const BROTLI_BUFFER_SIZE: usize = 4096;
const BROTLI_QUALITY: i32 = 11;
const BROTLI_LG_WINDOW: i32 = 22;
const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    #[default]
    None,
    /// Raw deflate stream.
    Zip,
    Gzip,
    Brotli,
    Zstd,
    /// Snappy framed stream.
    S2,
    /// Recognised by name, never wired up.
    Huff,
    Bzip2,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Compression::None => "None",
            Compression::Zip => "Zip",
            Compression::Gzip => "Gzip",
            Compression::Brotli => "Brotli",
            Compression::Zstd => "Zstd",
            Compression::S2 => "S2",
            Compression::Huff => "Huff",
            Compression::Bzip2 => "Bzip2",
        };
        f.write_str(name)
    }
}

impl Compression {
    /// Map a command-line codec name. Unknown names mean no compression.
    pub fn from_flag(flag: &str) -> Self {
        match flag {
            "zip" => Compression::Zip,
            "gz" | "gzip" => Compression::Gzip,
            "b" | "brotli" => Compression::Brotli,
            "zstd" => Compression::Zstd,
            "s2" => Compression::S2,
            "bz2" | "bzip2" => Compression::Bzip2,
            "h" | "huff" => Compression::Huff,
            _ => Compression::None,
        }
    }

    pub fn is_supported(self) -> bool {
        self != Compression::Huff
    }

    /// Fail with `UnsupportedCompression` unless this codec is wired up.
    pub fn ensure_supported(self) -> Result<(), BitstatError> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(BitstatError::UnsupportedCompression(self))
        }
    }

    /// Wrap `reader` so that reading from it yields decompressed bytes.
    pub fn reader<'a, R: Read + 'a>(self, reader: R) -> Result<Box<dyn Read + 'a>, BitstatError> {
        trace!("opening {self} reader");
        let r: Box<dyn Read + 'a> = match self {
            Compression::None => Box::new(reader),
            Compression::Zip => Box::new(flate2::read::DeflateDecoder::new(reader)),
            Compression::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
            Compression::Brotli => Box::new(brotli::Decompressor::new(reader, BROTLI_BUFFER_SIZE)),
            Compression::Zstd => Box::new(
                zstd::stream::read::Decoder::new(reader)
                    .map_err(|source| BitstatError::DecodeError { codec: self, source })?,
            ),
            Compression::S2 => Box::new(snap::read::FrameDecoder::new(reader)),
            Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(reader)),
            Compression::Huff => return Err(BitstatError::UnsupportedCompression(self)),
        };
        Ok(r)
    }

    /// Decompress a whole buffer.
    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>, BitstatError> {
        let mut out = Vec::new();
        self.reader(data)?
            .read_to_end(&mut out)
            .map_err(|source| BitstatError::DecodeError { codec: self, source })?;
        trace!("{self}: {} bytes decompressed to {}", data.len(), out.len());
        Ok(out)
    }

    /// Compress a whole buffer at the codec's best setting.
    pub fn compress(self, data: &[u8]) -> Result<Vec<u8>, BitstatError> {
        self.ensure_supported()?;
        let out = self
            .compress_inner(data)
            .map_err(|source| BitstatError::EncodeError { codec: self, source })?;
        trace!("{self}: {} bytes compressed to {}", data.len(), out.len());
        Ok(out)
    }

    fn compress_inner(self, data: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Zip => {
                let mut enc =
                    flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::best());
                enc.write_all(data)?;
                enc.finish()
            }
            Compression::Gzip => {
                let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::best());
                enc.write_all(data)?;
                enc.finish()
            }
            Compression::Brotli => {
                let mut out = Vec::new();
                let params = brotli::enc::BrotliEncoderParams {
                    quality: BROTLI_QUALITY,
                    lgwin: BROTLI_LG_WINDOW,
                    ..Default::default()
                };
                brotli::BrotliCompress(&mut &data[..], &mut out, &params)?;
                Ok(out)
            }
            Compression::Zstd => zstd::stream::encode_all(data, ZSTD_LEVEL),
            Compression::S2 => {
                let mut out = Vec::new();
                {
                    let mut enc = snap::write::FrameEncoder::new(&mut out);
                    enc.write_all(data)?;
                    enc.flush()?;
                }
                Ok(out)
            }
            Compression::Bzip2 => {
                let mut enc = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::best());
                enc.write_all(data)?;
                enc.finish()
            }
            Compression::Huff => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "huffman coding is not implemented",
            )),
        }
    }
}
