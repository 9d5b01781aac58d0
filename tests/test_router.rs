use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use hearth::http::request::Request;
use hearth::http::response::Response;
use hearth::http::router::Router;
use hearth::server::buffer::TransferBlock;
use hearth::server::connection::ChunkSink;

#[derive(Clone, Default)]
struct SinkSpy {
    data: Arc<Mutex<Vec<u8>>>,
    closes: Arc<AtomicUsize>,
}

impl SinkSpy {
    fn text(&self) -> String {
        String::from_utf8(self.data.lock().unwrap().clone()).unwrap()
    }
}

impl ChunkSink for SinkSpy {
    fn write_chunk(&self, block: TransferBlock) {
        self.data.lock().unwrap().extend_from_slice(block.as_ref());
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

fn request_for(url: &str) -> Request {
    Request {
        method: "GET".to_string(),
        url: url.to_string(),
        ..Request::default()
    }
}

fn response_with_spy() -> (Response, SinkSpy) {
    let spy = SinkSpy::default();
    (Response::new(Box::new(spy.clone())), spy)
}

#[test]
fn test_every_matching_route_is_invoked_in_registration_order() {
    let calls: Arc<Mutex<Vec<&'static str>>> = Arc::default();
    let mut router = Router::new();

    let log = calls.clone();
    router
        .add("^/both", move |_req, _out| log.lock().unwrap().push("first"))
        .unwrap();
    let log = calls.clone();
    router
        .add("/both$", move |_req, _out| log.lock().unwrap().push("second"))
        .unwrap();
    let log = calls.clone();
    router
        .add("^/other$", move |_req, _out| log.lock().unwrap().push("other"))
        .unwrap();

    let mut request = request_for("/both");
    let (mut response, _spy) = response_with_spy();
    router.dispatch(&mut request, &mut response);

    assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
}

#[test]
fn test_capture_groups_are_bound_before_each_handler() {
    let seen: Arc<Mutex<Option<String>>> = Arc::default();
    let mut router = Router::new();

    let captured = seen.clone();
    router
        .add(r"^/items/(\d+)/(\w+)$", move |req, _out| {
            *captured.lock().unwrap() =
                Some(format!("{}:{}", req.capture(0).unwrap(), req.capture(1).unwrap()));
        })
        .unwrap();

    let mut request = request_for("/items/42/details");
    let (mut response, _spy) = response_with_spy();
    router.dispatch(&mut request, &mut response);

    assert_eq!(seen.lock().unwrap().as_deref(), Some("42:details"));
    assert_eq!(request.captures, vec!["42", "details"]);
}

#[test]
fn test_no_match_defaults_to_404() {
    let mut router = Router::new();
    router.add("^/known$", |_req, _out| {}).unwrap();

    let mut request = request_for("/unknown");
    let (mut response, spy) = response_with_spy();
    router.dispatch(&mut request, &mut response);
    response.close();

    assert_eq!(response.status_code(), Some(404));
    assert!(spy.text().starts_with("HTTP/1.1 404 Not Found\r\n"));
}

#[test]
fn test_handler_output_flows_to_the_sink() {
    let mut router = Router::new();
    router
        .add("^/hello$", |_req, out| {
            out.body("Hello, world!\n");
        })
        .unwrap();

    let mut request = request_for("/hello");
    let (mut response, spy) = response_with_spy();
    router.dispatch(&mut request, &mut response);
    response.close();

    let text = spy.text();
    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.ends_with("Hello, world!\n"));
}

#[test]
fn test_invalid_pattern_is_rejected_at_registration() {
    let mut router = Router::new();
    assert!(router.add("(unclosed", |_req, _out| {}).is_err());
}
