//! HTTP/1.1 response writer.
//!
//! Status and headers are buffered until the body arrives, so that the
//! `content-length` header can be written from the actual body size. The whole
//! response is then written to the underlying writer in one go.

use crate::ensure;
use crate::protocol::SendError;
use crate::transport::Transport;

use bytes::{BufMut, Bytes, BytesMut};
use http::{HeaderName, HeaderValue, StatusCode, header};
use std::io;
use std::io::Write;
use tracing::trace;

/// Initial buffer size allocated for head serialization
const INIT_HEAD_SIZE: usize = 4 * 1024;

#[derive(Debug)]
pub struct Http1Writer<W> {
    writer: W,
    status: StatusCode,
    head: BytesMut,
    finished: bool,
}

impl<W: Write> Http1Writer<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, status: StatusCode::OK, head: BytesMut::with_capacity(INIT_HEAD_SIZE), finished: false }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Transport for Http1Writer<W> {
    fn send_status(&mut self, status: StatusCode) -> Result<(), SendError> {
        ensure!(!self.finished, SendError::HeadAlreadySent);
        self.status = status;
        Ok(())
    }

    fn send_header(&mut self, name: &HeaderName, value: &HeaderValue) -> Result<(), SendError> {
        ensure!(!self.finished, SendError::HeadAlreadySent);
        // written from the body length instead
        if *name == header::CONTENT_LENGTH {
            return Ok(());
        }

        self.head.put_slice(name.as_ref());
        self.head.put_slice(b": ");
        self.head.put_slice(value.as_ref());
        self.head.put_slice(b"\r\n");
        Ok(())
    }

    fn send_body(&mut self, body: Bytes) -> Result<(), SendError> {
        ensure!(!self.finished, SendError::HeadAlreadySent);
        self.finished = true;

        let mut dst = BytesMut::with_capacity(self.head.len() + body.len() + 64);
        write!(
            FastWrite(&mut dst),
            "HTTP/1.1 {} {}\r\n",
            self.status.as_str(),
            self.status.canonical_reason().unwrap_or_default()
        )?;
        dst.put_slice(&self.head);
        write!(FastWrite(&mut dst), "content-length: {}\r\n\r\n", body.len())?;
        dst.put_slice(&body);

        trace!(status = self.status.as_u16(), size = dst.len(), "writing http/1.1 response");
        self.writer.write_all(&dst)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Fast writer implementation for writing to BytesMut.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
