use hearth::http::multipart;
use hearth::http::parser::HttpParser;
use hearth::http::request::HeaderMap;

fn multipart_headers(boundary: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.append(
        "Content-Type",
        format!("multipart/form-data; boundary={}", boundary),
    );
    headers
}

#[test]
fn test_two_parts_round_trip_byte_exact() {
    let payload_a: Vec<u8> = vec![0x00, 0x01, 0xff, 0xfe, 0x7f];
    let mut body = Vec::new();
    body.extend_from_slice(b"--X\r\n");
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"first\"; filename=\"a.bin\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(&payload_a);
    body.extend_from_slice(b"\r\n--X\r\n");
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"second\"; filename=\"b.txt\"\r\n\r\n",
    );
    body.extend_from_slice(b"hello");
    body.extend_from_slice(b"\r\n--X--\r\n");

    let files = multipart::extract(&multipart_headers("X"), &body);

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].name, "first");
    assert_eq!(files[0].filename, "a.bin");
    assert_eq!(files[0].body, payload_a);
    assert_eq!(files[1].name, "second");
    assert_eq!(files[1].filename, "b.txt");
    assert_eq!(files[1].body, b"hello".to_vec());
}

#[test]
fn test_part_without_filename_is_skipped() {
    let mut body = Vec::new();
    body.extend_from_slice(b"--B\r\n");
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"plain-field\"\r\n\r\n");
    body.extend_from_slice(b"value");
    body.extend_from_slice(b"\r\n--B\r\n");
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"upload\"; filename=\"f.txt\"\r\n\r\n",
    );
    body.extend_from_slice(b"data");
    body.extend_from_slice(b"\r\n--B--\r\n");

    let files = multipart::extract(&multipart_headers("B"), &body);

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "upload");
    assert_eq!(files[0].filename, "f.txt");
    assert_eq!(files[0].body, b"data".to_vec());
}

#[test]
fn test_part_without_blank_line_is_skipped() {
    let body = b"--B\r\nno header separator here--B--\r\n".to_vec();

    let files = multipart::extract(&multipart_headers("B"), &body);
    assert!(files.is_empty());
}

#[test]
fn test_non_multipart_content_type_yields_nothing() {
    let mut headers = HeaderMap::new();
    headers.append("Content-Type", "application/json");

    assert!(multipart::extract(&headers, b"{}").is_empty());
    assert!(multipart::extract(&HeaderMap::new(), b"data").is_empty());
}

#[test]
fn test_boundary_followed_by_more_parameters() {
    let mut headers = HeaderMap::new();
    headers.append(
        "Content-Type",
        "multipart/form-data; boundary=X; charset=utf-8",
    );

    let mut body = Vec::new();
    body.extend_from_slice(b"--X\r\n");
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"field\"; filename=\"f.txt\"\r\n\r\n",
    );
    body.extend_from_slice(b"payload");
    body.extend_from_slice(b"\r\n--X--\r\n");

    let files = multipart::extract(&headers, &body);

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "field");
    assert_eq!(files[0].body, b"payload".to_vec());
}

#[test]
fn test_missing_boundary_parameter_yields_nothing() {
    let mut headers = HeaderMap::new();
    headers.append("Content-Type", "multipart/form-data");

    assert!(multipart::extract(&headers, b"--X\r\n\r\nx\r\n--X--").is_empty());
}

#[test]
fn test_files_extracted_through_full_request_parse() {
    let mut body = Vec::new();
    body.extend_from_slice(b"--frontier\r\n");
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"doc\"; filename=\"notes.txt\"\r\n\r\n",
    );
    body.extend_from_slice(b"some text");
    body.extend_from_slice(b"\r\n--frontier--\r\n");

    let head = format!(
        "POST /upload HTTP/1.1\r\nContent-Type: multipart/form-data; boundary=frontier\r\nContent-Length: {}\r\n\r\n",
        body.len()
    );

    let mut parser = HttpParser::new();
    parser.feed(head.as_bytes());
    parser.feed(&body);

    assert!(parser.is_complete());
    let req = parser.take_request();
    assert_eq!(req.files.len(), 1);
    assert_eq!(req.files[0].filename, "notes.txt");
    assert_eq!(req.files[0].body, b"some text".to_vec());
}
