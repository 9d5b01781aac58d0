use std::fmt;

use crate::server::buffer::TransferBlock;
use crate::server::connection::ChunkSink;

/// Errors from misusing the response builder.
#[derive(Debug, PartialEq, Eq)]
pub enum ResponseError {
    /// A header was added after the header block had already been sent,
    /// which signals a handler-ordering bug.
    HeadersAlreadySent,
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseError::HeadersAlreadySent => {
                write!(f, "can't add header: headers already sent")
            }
        }
    }
}

impl std::error::Error for ResponseError {}

/// The standard reason phrase for a status code.
pub fn status_text(code: u16) -> &'static str {
    match code {
        100 => "Continue",
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Response builder with deferred header flush.
///
/// Status, headers and body accumulate independently, in any order and any
/// number of calls. Nothing is materialized until the first [`flush`]: at
/// that point the status line (defaulting to 200), the header block and a
/// `Content-Length` computed from the body accumulated so far are emitted
/// once, and `headers_sent` becomes permanent. Every flush then appends the
/// pending body bytes (an empty body is legal) and hands the block to the
/// connection.
///
/// [`close`] flushes and asks the connection to close. Dropping an unclosed
/// response closes it implicitly; that is a safety net, not the primary
/// contract.
///
/// [`flush`]: Self::flush
/// [`close`]: Self::close
pub struct Response {
    sink: Box<dyn ChunkSink>,
    status: Option<u16>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    headers_sent: bool,
    closed: bool,
}

impl Response {
    pub fn new(sink: Box<dyn ChunkSink>) -> Self {
        Self {
            sink,
            status: None,
            headers: Vec::new(),
            body: Vec::new(),
            headers_sent: false,
            closed: false,
        }
    }

    /// Sets the status code. Without an explicit call the response goes out
    /// as `200`.
    pub fn status(&mut self, code: u16) -> &mut Self {
        self.status = Some(code);
        self
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status
    }

    /// Adds a header line. Fails once the header block has been sent.
    pub fn add_header(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<&mut Self, ResponseError> {
        if self.headers_sent {
            return Err(ResponseError::HeadersAlreadySent);
        }
        self.headers.push((name.into(), value.into()));
        Ok(self)
    }

    /// Adds several headers at once.
    pub fn add_headers<N, V>(
        &mut self,
        headers: impl IntoIterator<Item = (N, V)>,
    ) -> Result<&mut Self, ResponseError>
    where
        N: Into<String>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.add_header(name, value)?;
        }
        Ok(self)
    }

    /// Appends bytes to the body.
    pub fn body(&mut self, data: impl AsRef<[u8]>) -> &mut Self {
        self.body.extend_from_slice(data.as_ref());
        self
    }

    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    /// Emits accumulated output to the connection. The status line, headers
    /// and `Content-Length` go out exactly once, on the first flush.
    pub fn flush(&mut self) {
        let mut out = Vec::new();

        if !self.headers_sent {
            let code = self.status.unwrap_or(200);
            out.extend_from_slice(
                format!("HTTP/1.1 {} {}\r\n", code, status_text(code)).as_bytes(),
            );
            for (name, value) in &self.headers {
                out.extend_from_slice(name.as_bytes());
                out.extend_from_slice(b": ");
                out.extend_from_slice(value.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            out.extend_from_slice(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());
            out.extend_from_slice(b"\r\n");
            self.headers_sent = true;
        }

        out.append(&mut self.body);
        self.sink.write_chunk(TransferBlock::from_vec(out));
    }

    /// Flushes and closes the underlying connection. Idempotent.
    pub fn close(&mut self) {
        if !self.closed {
            self.flush();
            self.sink.close();
            self.closed = true;
        }
    }
}

impl Drop for Response {
    fn drop(&mut self) {
        self.close();
    }
}
