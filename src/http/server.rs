use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::http::connection::HttpConnection;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::router::Router;
use crate::server::connection::Service;
use crate::server::reactor::Server;

/// The embeddable HTTP server: binds the reactor, collects routes, and runs
/// the loop with an [`HttpConnection`] service per accepted socket.
pub struct HttpServer {
    server: Server,
    router: Router,
}

impl HttpServer {
    pub fn bind(config: &ServerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            server: Server::bind(config)?,
            router: Router::new(),
        })
    }

    /// Registers a route. Patterns are regular expressions matched against
    /// the raw request URL; capture groups are bound onto the request.
    pub fn route<H>(&mut self, pattern: &str, handler: H) -> anyhow::Result<&mut Self>
    where
        H: Fn(&Request, &mut Response) + Send + Sync + 'static,
    {
        self.router.add(pattern, handler)?;
        Ok(self)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// Runs the reactor loop; blocks forever.
    pub fn run(mut self) -> anyhow::Result<()> {
        let router = Arc::new(std::mem::take(&mut self.router));
        self.server.service_factory(move || {
            Box::new(HttpConnection::new(router.clone())) as Box<dyn Service>
        });
        self.server.run()
    }
}
