//! Hearth - Embeddable HTTP Server Framework
//!
//! Applications register URL-pattern routes with handlers; the framework
//! owns socket acceptance, byte-stream buffering, HTTP parsing, multipart
//! decoding and response assembly. A single reactor thread performs all
//! socket I/O; a configurable worker pool (size 0 = inline synchronous
//! mode) drives the protocol layer.
//!
//! ```no_run
//! use hearth::config::ServerConfig;
//! use hearth::http::server::HttpServer;
//!
//! fn main() -> anyhow::Result<()> {
//!     let cfg = ServerConfig::default();
//!     let mut server = HttpServer::bind(&cfg)?;
//!     server.route("^/$", |_req, out| {
//!         out.body("Hello, world!\n");
//!     })?;
//!     server.run()
//! }
//! ```
//!
//! # Limitations
//!
//! The event queues between the reactor and the workers are unbounded: if
//! the reactor falls behind network flow control, or handlers produce output
//! faster than peers read it, memory grows without limit. There is no
//! idle-connection timeout; connections persist until the client
//! half-closes. One request is served per connection.

pub mod config;
pub mod http;
pub mod server;
