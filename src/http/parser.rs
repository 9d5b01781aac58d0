use crate::http::multipart;
use crate::http::request::{HeaderMap, Request};

/// Callbacks emitted by the [`Tokenizer`] as parsing advances.
///
/// Spans are not buffer-boundary aligned: the URL, a header field and a
/// header value may each arrive in several callbacks when the element
/// straddles input chunks, so implementors must accumulate.
pub trait ParseSink {
    fn on_url(&mut self, data: &[u8]);
    fn on_header_field(&mut self, data: &[u8]);
    fn on_header_value(&mut self, data: &[u8]);
    fn on_headers_complete(&mut self);
    fn on_body(&mut self, data: &[u8]);
    fn on_message_complete(&mut self);
}

/// Request methods recognized by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
}

impl Method {
    fn from_token(token: &[u8]) -> Option<Self> {
        match token {
            b"GET" => Some(Method::Get),
            b"POST" => Some(Method::Post),
            b"PUT" => Some(Method::Put),
            b"DELETE" => Some(Method::Delete),
            b"HEAD" => Some(Method::Head),
            b"OPTIONS" => Some(Method::Options),
            b"PATCH" => Some(Method::Patch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Method,
    BeforeUrl,
    Url,
    AfterUrl,
    RequestLineLf,
    HeaderStart,
    HeaderField,
    HeaderValueStart,
    HeaderValue,
    HeaderLf,
    HeadersEndLf,
    Body,
    Done,
    /// Structurally broken input. Parsing stalls and the message never
    /// completes; no error is surfaced to the peer.
    Dead,
}

/// Incremental HTTP/1.1 request tokenizer.
///
/// Feed it arbitrarily sized chunks with [`execute`](Self::execute); it
/// invokes [`ParseSink`] callbacks mid-stream as elements are recognized.
/// The tokenizer itself keeps only what it needs to delimit the message:
/// the method token and the `Content-Length` value.
pub struct Tokenizer {
    state: State,
    method_token: Vec<u8>,
    method: Option<Method>,
    field_scratch: String,
    value_scratch: String,
    tracking_length: bool,
    content_length: usize,
    body_remaining: usize,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            state: State::Start,
            method_token: Vec::new(),
            method: None,
            field_scratch: String::new(),
            value_scratch: String::new(),
            tracking_length: false,
            content_length: 0,
            body_remaining: 0,
        }
    }

    /// The method code, available once the request line has been consumed.
    pub fn method(&self) -> Option<Method> {
        self.method
    }

    pub fn execute(&mut self, data: &[u8], sink: &mut dyn ParseSink) {
        let mut i = 0;
        let mut url_mark: Option<usize> = None;
        let mut field_mark: Option<usize> = None;
        let mut value_mark: Option<usize> = None;

        while i < data.len() {
            let b = data[i];
            match self.state {
                State::Start => {
                    if b == b'\r' || b == b'\n' {
                        i += 1;
                    } else {
                        self.state = State::Method;
                    }
                }
                State::Method => {
                    if b == b' ' {
                        self.method = Method::from_token(&self.method_token);
                        self.state = State::BeforeUrl;
                    } else {
                        self.method_token.push(b);
                    }
                    i += 1;
                }
                State::BeforeUrl => {
                    if b == b' ' {
                        i += 1;
                    } else {
                        self.state = State::Url;
                    }
                }
                State::Url => {
                    if url_mark.is_none() {
                        url_mark = Some(i);
                    }
                    if b == b' ' || b == b'\r' || b == b'\n' {
                        if let Some(mark) = url_mark.take() {
                            if i > mark {
                                sink.on_url(&data[mark..i]);
                            }
                        }
                        self.state = match b {
                            b' ' => State::AfterUrl,
                            b'\r' => State::RequestLineLf,
                            _ => State::HeaderStart,
                        };
                    }
                    i += 1;
                }
                State::AfterUrl => {
                    // HTTP version token; not reported.
                    if b == b'\r' {
                        self.state = State::RequestLineLf;
                    } else if b == b'\n' {
                        self.state = State::HeaderStart;
                    }
                    i += 1;
                }
                State::RequestLineLf => {
                    if b == b'\n' {
                        i += 1;
                    }
                    self.state = State::HeaderStart;
                }
                State::HeaderStart => {
                    if b == b'\r' {
                        self.state = State::HeadersEndLf;
                        i += 1;
                    } else if b == b'\n' {
                        self.headers_complete(sink);
                        i += 1;
                    } else {
                        self.state = State::HeaderField;
                    }
                }
                State::HeaderField => {
                    if field_mark.is_none() {
                        field_mark = Some(i);
                    }
                    if b == b':' {
                        if let Some(mark) = field_mark.take() {
                            self.emit_field(&data[mark..i], sink);
                        }
                        self.tracking_length = self.field_scratch == "content-length";
                        self.state = State::HeaderValueStart;
                        i += 1;
                    } else if b == b'\r' || b == b'\n' {
                        // Header line without a colon: structurally invalid.
                        self.state = State::Dead;
                    } else {
                        i += 1;
                    }
                }
                State::HeaderValueStart => {
                    if b == b' ' || b == b'\t' {
                        i += 1;
                    } else if b == b'\r' {
                        self.end_header_line();
                        self.state = State::HeaderLf;
                        i += 1;
                    } else if b == b'\n' {
                        self.end_header_line();
                        self.state = State::HeaderStart;
                        i += 1;
                    } else {
                        self.state = State::HeaderValue;
                    }
                }
                State::HeaderValue => {
                    if value_mark.is_none() {
                        value_mark = Some(i);
                    }
                    if b == b'\r' || b == b'\n' {
                        if let Some(mark) = value_mark.take() {
                            self.emit_value(&data[mark..i], sink);
                        }
                        self.end_header_line();
                        self.state = if b == b'\r' {
                            State::HeaderLf
                        } else {
                            State::HeaderStart
                        };
                    }
                    i += 1;
                }
                State::HeaderLf => {
                    if b == b'\n' {
                        i += 1;
                    }
                    self.state = State::HeaderStart;
                }
                State::HeadersEndLf => {
                    if b == b'\n' {
                        i += 1;
                    }
                    self.headers_complete(sink);
                }
                State::Body => {
                    let take = self.body_remaining.min(data.len() - i);
                    sink.on_body(&data[i..i + take]);
                    self.body_remaining -= take;
                    i += take;
                    if self.body_remaining == 0 {
                        sink.on_message_complete();
                        self.state = State::Done;
                    }
                }
                // One in-flight request per socket: trailing bytes after the
                // message, like anything after a structural error, are
                // ignored.
                State::Done | State::Dead => return,
            }
        }

        // Flush spans left open at the end of the chunk.
        match self.state {
            State::Url => {
                if let Some(mark) = url_mark {
                    if data.len() > mark {
                        sink.on_url(&data[mark..]);
                    }
                }
            }
            State::HeaderField => {
                if let Some(mark) = field_mark {
                    self.emit_field(&data[mark..], sink);
                }
            }
            State::HeaderValue => {
                if let Some(mark) = value_mark {
                    self.emit_value(&data[mark..], sink);
                }
            }
            _ => {}
        }
    }

    fn emit_field(&mut self, span: &[u8], sink: &mut dyn ParseSink) {
        if span.is_empty() {
            return;
        }
        sink.on_header_field(span);
        for &b in span {
            self.field_scratch.push(b.to_ascii_lowercase() as char);
        }
    }

    fn emit_value(&mut self, span: &[u8], sink: &mut dyn ParseSink) {
        if span.is_empty() {
            return;
        }
        sink.on_header_value(span);
        if self.tracking_length {
            self.value_scratch.push_str(&String::from_utf8_lossy(span));
        }
    }

    fn end_header_line(&mut self) {
        if self.tracking_length {
            // A bad Content-Length degrades to zero rather than erroring.
            self.content_length = self.value_scratch.trim().parse().unwrap_or(0);
        }
        self.field_scratch.clear();
        self.value_scratch.clear();
        self.tracking_length = false;
    }

    fn headers_complete(&mut self, sink: &mut dyn ParseSink) {
        sink.on_headers_complete();
        if self.content_length > 0 {
            self.body_remaining = self.content_length;
            self.state = State::Body;
        } else {
            sink.on_message_complete();
            self.state = State::Done;
        }
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulation state behind the tokenizer callbacks.
///
/// Header accumulation keeps a pending (field, value) pair: a new field span
/// first flushes the previous pair into the multimap (only when both halves
/// are non-empty) before extending the new field, and headers-complete
/// performs the final flush. Field and value spans can each fire several
/// times per header, so these are the only correct flush points.
#[derive(Default)]
struct RequestCollector {
    url: Vec<u8>,
    pending_field: String,
    pending_value: String,
    headers: HeaderMap,
    body: Vec<u8>,
    headers_done: bool,
    message_done: bool,
}

impl RequestCollector {
    fn flush_pending(&mut self) {
        if !self.pending_field.is_empty() && !self.pending_value.is_empty() {
            self.headers.append(
                std::mem::take(&mut self.pending_field),
                std::mem::take(&mut self.pending_value),
            );
        }
    }
}

impl ParseSink for RequestCollector {
    fn on_url(&mut self, data: &[u8]) {
        self.url.extend_from_slice(data);
    }

    fn on_header_field(&mut self, data: &[u8]) {
        self.flush_pending();
        self.pending_field.push_str(&String::from_utf8_lossy(data));
    }

    fn on_header_value(&mut self, data: &[u8]) {
        self.pending_value.push_str(&String::from_utf8_lossy(data));
    }

    fn on_headers_complete(&mut self) {
        self.flush_pending();
        self.headers_done = true;
    }

    fn on_body(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
    }

    fn on_message_complete(&mut self) {
        self.message_done = true;
    }
}

/// Structured request parser: the tokenizer plus the accumulation state that
/// turns its callbacks into a [`Request`].
pub struct HttpParser {
    tokenizer: Tokenizer,
    collector: RequestCollector,
}

impl HttpParser {
    pub fn new() -> Self {
        Self {
            tokenizer: Tokenizer::new(),
            collector: RequestCollector::default(),
        }
    }

    /// Feeds one chunk of input, of any size and alignment.
    pub fn feed(&mut self, data: &[u8]) {
        self.tokenizer.execute(data, &mut self.collector);
    }

    pub fn headers_complete(&self) -> bool {
        self.collector.headers_done
    }

    pub fn is_complete(&self) -> bool {
        self.collector.message_done
    }

    /// True once the headers carry an `Expect: 100-continue` expectation.
    /// The caller owes the peer an interim `100 Continue` status line and
    /// must keep feeding body bytes afterwards.
    pub fn expects_continue(&self) -> bool {
        self.collector.headers_done
            && self
                .collector
                .headers
                .get("Expect")
                .is_some_and(|v| v == "100-continue")
    }

    /// Consumes the accumulated state into a [`Request`]. The method is
    /// resolved to a string here, at message-complete, and multipart file
    /// parts are extracted from the fully buffered body.
    pub fn take_request(&mut self) -> Request {
        let collector = std::mem::take(&mut self.collector);
        let method = self
            .tokenizer
            .method()
            .map(|m| m.as_str())
            .unwrap_or_default()
            .to_string();
        let url = String::from_utf8_lossy(&collector.url).into_owned();
        let files = multipart::extract(&collector.headers, &collector.body);

        Request {
            method,
            url,
            headers: collector.headers,
            body: collector.body,
            files,
            captures: Vec::new(),
        }
    }
}

impl Default for HttpParser {
    fn default() -> Self {
        Self::new()
    }
}
