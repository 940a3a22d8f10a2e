// Length-delimited framing for JSON payloads.
//
// Every frame is a 4-byte big-endian length followed by that many payload
// bytes. The same framing carries wire messages over TCP and the records of
// demo files on disk, so a demo is just a stream of frames. Callers handle
// JSON (de)serialization; this module only moves bytes.

use std::io::{self, Read, Write};

/// Largest accepted frame (16 MiB). Guards against allocating from a corrupt
/// or hostile length prefix.
pub const MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

/// Write one frame and flush.
pub fn write_message<W: Write>(writer: &mut W, msg: &[u8]) -> io::Result<()> {
    write_frame(writer, msg)?;
    writer.flush()
}

/// Write one frame without flushing, for buffered file output.
pub fn write_frame<W: Write>(writer: &mut W, msg: &[u8]) -> io::Result<()> {
    let len = u32::try_from(msg.len())
        .ok()
        .filter(|len| *len <= MAX_MESSAGE_SIZE)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "frame too large: {} bytes (max {MAX_MESSAGE_SIZE})",
                    msg.len()
                ),
            )
        })?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(msg)
}

/// Read one frame.
///
/// `UnexpectedEof` if the stream ends before or inside the frame,
/// `InvalidData` if the length prefix exceeds `MAX_MESSAGE_SIZE`.
pub fn read_message<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    match try_read_message(reader)? {
        Some(frame) => Ok(frame),
        None => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "stream ended before frame",
        )),
    }
}

/// Read one frame, or `None` if the stream ends cleanly on a frame boundary.
///
/// A stream that ends inside the length prefix or the payload is still an
/// `UnexpectedEof` error.
pub fn try_read_message<R: Read>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        match reader.read(&mut len_buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside length prefix",
                ));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {len} bytes (max {MAX_MESSAGE_SIZE})"),
        ));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn frames_read_back_in_order() {
        let frames: Vec<&[u8]> = vec![b"header", b"", b"tick"];
        let mut buf = Vec::new();
        for frame in &frames {
            write_message(&mut buf, frame).unwrap();
        }

        let mut cursor = Cursor::new(&buf);
        for expected in &frames {
            assert_eq!(read_message(&mut cursor).unwrap(), *expected);
        }
        assert!(try_read_message(&mut cursor).unwrap().is_none());
    }

    /// Counts flushes reaching the underlying writer.
    #[derive(Default)]
    struct FlushCounter {
        bytes: Vec<u8>,
        flushes: usize,
    }

    impl Write for FlushCounter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn only_write_message_flushes() {
        let mut out = FlushCounter::default();
        write_frame(&mut out, b"one").unwrap();
        write_frame(&mut out, b"two").unwrap();
        assert_eq!(out.flushes, 0);
        write_message(&mut out, b"three").unwrap();
        assert_eq!(out.flushes, 1);

        let mut cursor = Cursor::new(out.bytes);
        assert_eq!(read_message(&mut cursor).unwrap(), b"one");
        assert_eq!(read_message(&mut cursor).unwrap(), b"two");
        assert_eq!(read_message(&mut cursor).unwrap(), b"three");
    }

    #[test]
    fn rejects_oversized_write() {
        let big = vec![0u8; MAX_MESSAGE_SIZE as usize + 1];
        let err = write_message(&mut Vec::new(), &big).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn rejects_oversized_length_prefix() {
        let mut cursor = Cursor::new((MAX_MESSAGE_SIZE + 1).to_be_bytes().to_vec());
        let err = read_message(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn truncated_prefix_is_an_error_not_a_clean_end() {
        let mut cursor = Cursor::new(vec![0u8, 1]);
        let err = try_read_message(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let mut buf = Vec::new();
        write_message(&mut buf, b"abcdef").unwrap();
        buf.truncate(buf.len() - 2);
        let err = try_read_message(&mut Cursor::new(buf)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
