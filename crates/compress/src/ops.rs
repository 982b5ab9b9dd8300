//! Compression Operations

use crate::Compression;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use flate2::{Compression as GzCompression, read::GzDecoder, write::GzEncoder};
use std::io::{Read, Write};
use tracing::instrument;

// Use the highest compression level available; cached artifacts are written
// once and read many times, so storage space wins over speed.
const GZIP_LEVEL: GzCompression = GzCompression::best();

/// A compressing [`Write`]r that must be explicitly [`finish`](Self::finish)ed.
///
/// Dropping an unfinished Gzip encoder writes the trailer on a best-effort
/// basis and loses any error; finishing surfaces it.
pub struct Encoder<W: Write> {
    inner: Inner<W>,
}

enum Inner<W: Write> {
    Plain(W),
    Gzip(GzEncoder<W>),
}

impl<W: Write> Encoder<W> {
    /// Flush any buffered data, write the format trailer, and return the
    /// underlying writer.
    pub fn finish(self) -> Result<W> {
        match self.inner {
            Inner::Plain(mut writer) => {
                writer.flush().or_raise(|| ErrorKind::Io)?;
                Ok(writer)
            },
            Inner::Gzip(encoder) => encoder.finish().or_raise(|| ErrorKind::Encoder),
        }
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            Inner::Plain(writer) => writer.write(buf),
            Inner::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            Inner::Plain(writer) => writer.flush(),
            Inner::Gzip(encoder) => encoder.flush(),
        }
    }
}

impl Compression {
    /// Compress a byte slice in memory.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiln_compress::Compression;
    ///
    /// let data = b"Hello, world!";
    /// let compressed = Compression::Gzip.compress(data).unwrap();
    /// assert_ne!(compressed, data);
    /// ```
    #[instrument(skip(input), fields(format = %self, input_size = input.len()))]
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = self.encoder(Vec::with_capacity(input.len()));
        encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
        encoder.finish()
    }

    /// Decompress a byte slice in memory.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use kiln_compress::Compression;
    ///
    /// let original = b"Hello, world!";
    /// let compressed = Compression::Gzip.compress(original).unwrap();
    /// let decompressed = Compression::Gzip.decompress(&compressed).unwrap();
    /// assert_eq!(decompressed, original);
    /// ```
    #[instrument(skip(input), fields(format = %self, input_size = input.len()))]
    pub fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.wrap_reader(input).read_to_end(&mut output).or_raise(|| ErrorKind::InvalidData)?;
        Ok(output)
    }

    /// Wrap a reader with the appropriate decompression layer.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::{Cursor, Read};
    /// use kiln_compress::Compression;
    ///
    /// let compressed = Compression::Gzip.compress(b"Hello, world!").unwrap();
    /// let mut reader = Compression::Gzip.wrap_reader(Cursor::new(compressed));
    /// let mut decompressed = Vec::new();
    /// reader.read_to_end(&mut decompressed).unwrap();
    /// assert_eq!(decompressed, b"Hello, world!");
    /// ```
    pub fn wrap_reader<'a, R: Read + 'a>(&self, reader: R) -> Box<dyn Read + 'a> {
        match self {
            Compression::None => Box::new(reader),
            Compression::Gzip => Box::new(GzDecoder::new(reader)),
        }
    }

    /// Wrap a writer with the appropriate compression layer.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Write;
    /// use kiln_compress::Compression;
    ///
    /// let mut encoder = Compression::Gzip.encoder(Vec::new());
    /// encoder.write_all(b"Hello, world!").unwrap();
    /// let compressed = encoder.finish().unwrap();
    /// assert_eq!(Compression::Gzip.decompress(&compressed).unwrap(), b"Hello, world!");
    /// ```
    pub fn encoder<W: Write>(&self, writer: W) -> Encoder<W> {
        let inner = match self {
            Compression::None => Inner::Plain(writer),
            Compression::Gzip => Inner::Gzip(GzEncoder::new(writer, GZIP_LEVEL)),
        };
        Encoder { inner }
    }
}
