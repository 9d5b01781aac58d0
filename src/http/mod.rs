//! HTTP protocol layer.
//!
//! Built on top of the [`server`](crate::server) core:
//!
//! - **`parser`**: incremental callback-driven tokenizer and the structured
//!   request parser wrapped around it
//! - **`request`**: request model: method, URL, header multimap, body,
//!   uploaded files, route captures
//! - **`multipart`**: `multipart/form-data` extraction from a buffered body
//! - **`response`**: response builder with deferred header flush
//! - **`router`**: regex route table, all matches invoked
//! - **`connection`**: the protocol service gluing parser and router to one
//!   socket
//! - **`server`**: the embeddable [`HttpServer`](server::HttpServer) facade
//! - **`static_files`**: chunked file-serving helper

pub mod connection;
pub mod multipart;
pub mod parser;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod static_files;
