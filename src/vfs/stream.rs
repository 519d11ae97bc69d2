use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};

/// Readable stream that can report how many bytes are ready without blocking.
///
/// `available` is a lower bound on the remaining length, not a true length.
pub trait ReadStream: Read + Send {
    fn available(&self) -> std::io::Result<u64>;
}

/// Stream returned by `open_input_stream`. Released on drop.
pub type InputStream = Box<dyn ReadStream>;

/// Stream returned by `open_output_stream`. Released on drop.
pub type OutputStream = Box<dyn Write + Send>;

/// How an existing row's content is opened for writing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// `w`: write-only, used for rows known to be new
    Write,
    /// `wt`: truncate existing content
    Truncate,
    /// `wa`: append to existing content
    Append,
}

impl WriteMode {
    pub fn for_existing(append: bool) -> Self {
        if append {
            WriteMode::Append
        } else {
            WriteMode::Truncate
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WriteMode::Write => "w",
            WriteMode::Truncate => "wt",
            WriteMode::Append => "wa",
        }
    }
}

impl ReadStream for File {
    fn available(&self) -> std::io::Result<u64> {
        let len = self.metadata()?.len();
        let mut handle = self;
        let position = handle.stream_position()?;
        Ok(len.saturating_sub(position))
    }
}

impl<T> ReadStream for Cursor<T>
where
    T: AsRef<[u8]> + Send,
{
    fn available(&self) -> std::io::Result<u64> {
        let len = self.get_ref().as_ref().len() as u64;
        Ok(len.saturating_sub(self.position()))
    }
}
