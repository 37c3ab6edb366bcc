//! Line-aligned splitting of a byte stream read through a fixed-size buffer.
//!
//! The first line is the header. Everything after it is cut into chunks that end right before a line terminator,
//! so no line is ever split across two chunks. A line longer than the buffer is reassembled across reads.

use std::io::{ErrorKind, Read};

use crate::Error;

const LINE_TERMINATOR: u8 = b'\n';

/// Reads the header line and returns it together with an iterator over the remaining content.
pub fn split_chunks<R: Read>(
    mut reader: R,
    buffer_size: usize,
) -> Result<(String, LineAlignedChunks<R>), Error> {
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut header = Vec::new();

    let remainder = loop {
        let read = read_some(&mut reader, &mut buffer)?;
        if read == 0 {
            return Err(Error::HeaderNotFound);
        }
        let bytes = &buffer[..read];
        match bytes.iter().position(|&b| b == LINE_TERMINATOR) {
            Some(idx) => {
                header.extend_from_slice(&bytes[..idx]);
                break bytes[idx + 1..].to_vec();
            }
            None => header.extend_from_slice(bytes),
        }
    };

    let header = String::from_utf8_lossy(&header).trim_end_matches('\r').to_string();
    if header.is_empty() {
        return Err(Error::HeaderNotFound);
    }

    let chunks = LineAlignedChunks {
        reader,
        buffer,
        remainder,
        scanned: 0,
        done: false,
    };
    Ok((header, chunks))
}

/// Iterator over the line-aligned chunks of the content following the header.
///
/// A chunk never contains its trailing line terminator, and never is empty. The terminators between chunks are
/// dropped: joining the chunks with `\n` reconstructs the content without its final terminator.
#[derive(Debug)]
pub struct LineAlignedChunks<R> {
    reader: R,
    buffer: Vec<u8>,
    // bytes read but not emitted yet
    remainder: Vec<u8>,
    // prefix of `remainder` known to hold no terminator
    scanned: usize,
    done: bool,
}

impl<R: Read> Iterator for LineAlignedChunks<R> {
    type Item = Result<Vec<u8>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let read = match read_some(&mut self.reader, &mut self.buffer) {
                Ok(read) => read,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            if read == 0 {
                self.done = true;
                let mut chunk = std::mem::take(&mut self.remainder);
                if chunk.last() == Some(&LINE_TERMINATOR) {
                    chunk.pop();
                }
                if chunk.is_empty() {
                    return None;
                }
                return Some(Ok(chunk));
            }

            self.remainder.extend_from_slice(&self.buffer[..read]);

            let Some(offset) = self.remainder[self.scanned..]
                .iter()
                .rposition(|&b| b == LINE_TERMINATOR)
            else {
                self.scanned = self.remainder.len();
                continue;
            };

            let terminator = self.scanned + offset;
            let tail = self.remainder.split_off(terminator + 1);
            let mut chunk = std::mem::replace(&mut self.remainder, tail);
            chunk.pop();
            self.scanned = self.remainder.len();

            if !chunk.is_empty() {
                return Some(Ok(chunk));
            }
        }
        None
    }
}

fn read_some(reader: &mut impl Read, buffer: &mut [u8]) -> Result<usize, Error> {
    loop {
        match reader.read(buffer) {
            Ok(read) => return Ok(read),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
