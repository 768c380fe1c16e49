use std::io::{ErrorKind, Write};

use tracing::trace;

use crate::error::{Result, TransportError};

/// Destination for encoded frames.
///
/// Sinks are fire-and-forget: `transmit` returns once the bytes are handed
/// off and never waits for the hardware to acknowledge them.
pub trait TransmitSink {
    /// Hand one complete frame to the link.
    fn transmit(&mut self, frame: &[u8]) -> Result<()>;
}

impl<S: TransmitSink + ?Sized> TransmitSink for &mut S {
    fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        (**self).transmit(frame)
    }
}

impl<S: TransmitSink + ?Sized> TransmitSink for Box<S> {
    fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        (**self).transmit(frame)
    }
}

/// Writes each frame to any `Write` stream and flushes it.
///
/// A non-blocking stream that reports `WouldBlock` fails the frame with
/// [`TransportError::Io`] instead of being polled until it drains.
pub struct WriteSink<W> {
    inner: W,
}

impl<W: Write> WriteSink<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consume the sink and return the inner stream.
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn flush_inner(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl<W: Write> TransmitSink for WriteSink<W> {
    fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < frame.len() {
            match self.inner.write(&frame[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        trace!(len = frame.len(), "frame written");

        self.flush_inner()
    }
}

impl<W> std::fmt::Debug for WriteSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteSink").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn writes_whole_frame() {
        let mut sink = WriteSink::new(Cursor::new(Vec::<u8>::new()));
        sink.transmit(&[0xF0, 0x01, 0x02, 0xF7]).unwrap();
        sink.transmit(&[0xF0, 0x03, 0xF7]).unwrap();

        let written = sink.into_inner().into_inner();
        assert_eq!(written, vec![0xF0, 0x01, 0x02, 0xF7, 0xF0, 0x03, 0xF7]);
    }

    #[test]
    fn flush_propagates() {
        let inner = FlushTrackingWriter::default();
        let flag = Arc::clone(&inner.flushed);
        let mut sink = WriteSink::new(inner);

        sink.transmit(b"x").unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let mut sink = WriteSink::new(InterruptedOnce::default());
        sink.transmit(&[1, 2, 3]).unwrap();
        assert_eq!(sink.get_ref().data, vec![1, 2, 3]);
    }

    #[test]
    fn partial_writes_are_completed() {
        let mut sink = WriteSink::new(OneByteWriter::default());
        sink.transmit(&[9, 8, 7, 6]).unwrap();
        assert_eq!(sink.into_inner().data, vec![9, 8, 7, 6]);
    }

    #[test]
    fn closed_when_write_returns_zero() {
        let mut sink = WriteSink::new(ZeroWriter);
        let err = sink.transmit(b"x").unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[test]
    fn io_error_is_surfaced() {
        let mut sink = WriteSink::new(BrokenPipe);
        let err = sink.transmit(b"x").unwrap_err();
        assert!(matches!(err, TransportError::Io(ref e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[test]
    fn stalled_nonblocking_writer_fails_fast() {
        let mut sink = WriteSink::new(Stalled::default());
        let err = sink.transmit(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, TransportError::Io(ref e) if e.kind() == ErrorKind::WouldBlock));
        assert_eq!(sink.get_ref().attempts, 1);
    }

    #[test]
    fn boxed_and_borrowed_sinks_forward() {
        let mut sink = WriteSink::new(Vec::<u8>::new());
        {
            let mut borrowed: &mut WriteSink<Vec<u8>> = &mut sink;
            TransmitSink::transmit(&mut borrowed, &[1]).unwrap();
        }
        let mut boxed: Box<dyn TransmitSink> = Box::new(WriteSink::new(Vec::<u8>::new()));
        boxed.transmit(&[2]).unwrap();
        assert_eq!(sink.get_ref(), &vec![1]);
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct InterruptedOnce {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct OneByteWriter {
        data: Vec<u8>,
    }

    impl Write for OneByteWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.push(buf[0]);
            Ok(1)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Stalled {
        attempts: usize,
    }

    impl Write for Stalled {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            self.attempts += 1;
            Err(std::io::Error::from(ErrorKind::WouldBlock))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
