use std::sync::Arc;

use tracing::debug;

use crate::http::parser::HttpParser;
use crate::http::response::Response;
use crate::http::router::Router;
use crate::server::buffer::TransferBlock;
use crate::server::connection::{Connection, Service};

const CONTINUE_LINE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

/// HTTP protocol state for one connection: feeds the parser, answers the
/// `100-continue` expectation, and dispatches the completed request through
/// the router.
pub struct HttpConnection {
    parser: HttpParser,
    router: Arc<Router>,
    sent_continue: bool,
    dispatched: bool,
}

impl HttpConnection {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            parser: HttpParser::new(),
            router,
            sent_continue: false,
            dispatched: false,
        }
    }
}

impl Service for HttpConnection {
    fn on_bytes(&mut self, conn: &Connection, data: TransferBlock) {
        self.parser.feed(data.as_ref());

        // The interim status line goes out as soon as the expectation is
        // seen; the message is not complete yet and body bytes follow.
        if !self.sent_continue && self.parser.expects_continue() {
            self.sent_continue = true;
            conn.write_chunk(TransferBlock::copy_from(CONTINUE_LINE));
        }

        if self.parser.is_complete() && !self.dispatched {
            self.dispatched = true;
            let mut request = self.parser.take_request();
            debug!("[{}] {} {}", conn.id(), request.method, request.url);

            let mut response = Response::new(Box::new(conn.clone()));
            self.router.dispatch(&mut request, &mut response);
            response.close();
        }
    }
}
