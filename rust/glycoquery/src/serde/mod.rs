//! Record-stream readers shared by the library and spectrum loaders.
//!
//! Both inputs are streams of self-contained records in one of four
//! encodings. The encoding is taken from the file extension and, failing
//! that, sniffed from the first bytes of the file.

pub mod library_file;
pub mod spectrum_file;

pub use library_file::read_library;
pub use spectrum_file::read_sample;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{
    BufRead,
    BufReader,
    Read,
    Write,
};
use std::marker::PhantomData;
use std::path::Path;

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    NdJson,
    NdJsonZstd,
    MessagePack,
    MessagePackZstd,
}

/// Low level failure while pulling records off a stream.
#[derive(Debug)]
pub enum RecordError {
    Io(std::io::Error),
    Parse(String),
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::Io(e) => write!(f, "{}", e),
            RecordError::Parse(e) => write!(f, "{}", e),
        }
    }
}

impl RecordFormat {
    pub fn detect_from_path(path: &Path) -> std::io::Result<Self> {
        let path_str = path.to_string_lossy().to_lowercase();

        if path_str.ends_with(".msgpack.zst") {
            Ok(RecordFormat::MessagePackZstd)
        } else if path_str.ends_with(".msgpack") {
            Ok(RecordFormat::MessagePack)
        } else if path_str.ends_with(".ndjson.zst") {
            Ok(RecordFormat::NdJsonZstd)
        } else if path_str.ends_with(".ndjson") || path_str.ends_with(".jsonl") {
            Ok(RecordFormat::NdJson)
        } else {
            Self::detect_from_content(path)
        }
    }

    fn detect_from_content(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut buffer = [0u8; 8];

        match reader.read(&mut buffer) {
            Ok(bytes_read) if bytes_read >= 4 => {
                if buffer[0..4] == ZSTD_MAGIC {
                    Ok(RecordFormat::MessagePackZstd)
                } else if buffer[0] == b'{' {
                    Ok(RecordFormat::NdJson)
                } else {
                    Ok(RecordFormat::MessagePack)
                }
            }
            _ => Ok(RecordFormat::NdJson),
        }
    }

    fn is_compressed(&self) -> bool {
        matches!(self, RecordFormat::NdJsonZstd | RecordFormat::MessagePackZstd)
    }
}

/// Iterator over the records of a stream, whatever its encoding.
pub struct RecordReader<'a, T> {
    inner: Box<dyn Iterator<Item = Result<T, RecordError>> + Send + 'a>,
}

impl<'a, T: DeserializeOwned + Send + 'a> RecordReader<'a, T> {
    pub fn new<R: Read + Send + 'a>(reader: R, format: RecordFormat) -> Result<Self, RecordError> {
        let inner: Box<dyn Iterator<Item = Result<T, RecordError>> + Send + 'a> = match format {
            RecordFormat::NdJson => Box::new(NdJsonReader::new(BufReader::new(reader))),
            RecordFormat::NdJsonZstd => {
                let decoder = zstd::Decoder::new(reader).map_err(RecordError::Io)?;
                Box::new(NdJsonReader::new(BufReader::new(decoder)))
            }
            RecordFormat::MessagePack => Box::new(MessagePackReader::new(reader)),
            RecordFormat::MessagePackZstd => {
                let decoder = zstd::Decoder::new(reader).map_err(RecordError::Io)?;
                Box::new(MessagePackReader::new(decoder))
            }
        };
        Ok(RecordReader { inner })
    }
}

impl<T> Iterator for RecordReader<'_, T> {
    type Item = Result<T, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

struct NdJsonReader<R: BufRead, T> {
    reader: R,
    _marker: PhantomData<fn() -> T>,
}

impl<R: BufRead, T> NdJsonReader<R, T> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            _marker: PhantomData,
        }
    }
}

impl<R: BufRead, T: DeserializeOwned> Iterator for NdJsonReader<R, T> {
    type Item = Result<T, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None, // EOF
                Ok(_) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    return Some(
                        serde_json::from_str(&line).map_err(|e| RecordError::Parse(e.to_string())),
                    );
                }
                Err(e) => return Some(Err(RecordError::Io(e))),
            }
        }
    }
}

struct MessagePackReader<R: Read, T> {
    deserializer: rmp_serde::Deserializer<rmp_serde::decode::ReadReader<R>>,
    _marker: PhantomData<fn() -> T>,
}

impl<R: Read, T> MessagePackReader<R, T> {
    fn new(reader: R) -> Self {
        Self {
            deserializer: rmp_serde::Deserializer::new(reader),
            _marker: PhantomData,
        }
    }
}

impl<R: Read, T: DeserializeOwned> Iterator for MessagePackReader<R, T> {
    type Item = Result<T, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        use serde::Deserialize;

        match T::deserialize(&mut self.deserializer) {
            Ok(elem) => Some(Ok(elem)),
            Err(rmp_serde::decode::Error::InvalidMarkerRead(ref io_err))
                if io_err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                None
            } // EOF
            Err(rmp_serde::decode::Error::InvalidDataRead(ref io_err))
                if io_err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                None
            } // EOF
            Err(e) => Some(Err(RecordError::Parse(e.to_string()))),
        }
    }
}

/// Writes `records` to `path` in the given encoding.
pub fn write_records<T: Serialize>(
    records: &[T],
    path: &Path,
    format: RecordFormat,
) -> Result<(), RecordError> {
    let file = std::fs::File::create(path).map_err(RecordError::Io)?;
    let mut sink: Box<dyn Write> = if format.is_compressed() {
        Box::new(
            zstd::Encoder::new(file, 3)
                .map_err(RecordError::Io)?
                .auto_finish(),
        )
    } else {
        Box::new(std::io::BufWriter::new(file))
    };
    for rec in records {
        match format {
            RecordFormat::NdJson | RecordFormat::NdJsonZstd => {
                serde_json::to_writer(&mut sink, rec)
                    .map_err(|e| RecordError::Parse(e.to_string()))?;
                sink.write_all(b"\n").map_err(RecordError::Io)?;
            }
            RecordFormat::MessagePack | RecordFormat::MessagePackZstd => {
                rmp_serde::encode::write_named(&mut sink, rec)
                    .map_err(|e| RecordError::Parse(e.to_string()))?;
            }
        }
    }
    sink.flush().map_err(RecordError::Io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Rec {
        a: u32,
        b: String,
    }

    fn recs() -> Vec<Rec> {
        vec![
            Rec {
                a: 1,
                b: "x".into(),
            },
            Rec {
                a: 2,
                b: "y".into(),
            },
        ]
    }

    #[test]
    fn test_detect_from_path() {
        let f = |p: &str| RecordFormat::detect_from_path(Path::new(p)).unwrap();
        assert_eq!(f("lib.msgpack.zst"), RecordFormat::MessagePackZstd);
        assert_eq!(f("lib.MSGPACK"), RecordFormat::MessagePack);
        assert_eq!(f("lib.ndjson.zst"), RecordFormat::NdJsonZstd);
        assert_eq!(f("lib.ndjson"), RecordFormat::NdJson);
    }

    #[test]
    fn test_compressed_msgpack_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recs.bin");
        write_records(&recs(), &path, RecordFormat::MessagePackZstd).unwrap();
        // Unknown extension falls back to sniffing the zstd magic bytes.
        let format = RecordFormat::detect_from_path(&path).unwrap();
        assert_eq!(format, RecordFormat::MessagePackZstd);
        let file = std::fs::File::open(&path).unwrap();
        let out: Vec<Rec> = RecordReader::new(file, format)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(out, recs());
    }

    #[test]
    fn test_ndjson_skips_blank_lines_and_reports_bad_lines() {
        let text = "{\"a\":1,\"b\":\"x\"}\n\n{\"a\":2,\"b\":\"y\"}\nnot json\n";
        let out: Vec<Result<Rec, RecordError>> =
            RecordReader::new(text.as_bytes(), RecordFormat::NdJson)
                .unwrap()
                .collect();
        assert_eq!(out.len(), 3);
        assert!(out[0].is_ok());
        assert!(out[1].is_ok());
        assert!(matches!(out[2], Err(RecordError::Parse(_))));
    }
}
