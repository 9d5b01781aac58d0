use anyhow::Context;
use regex::Regex;

use crate::http::request::Request;
use crate::http::response::Response;

/// A route handler: side effect only, mutates the response.
pub type Handler = Box<dyn Fn(&Request, &mut Response) + Send + Sync>;

struct Route {
    pattern: Regex,
    handler: Handler,
}

/// Ordered route table matched against the raw request URL.
///
/// Every matching pattern fires, in registration order; multiple matches
/// are intentionally all invoked, not first-match-wins. Capture groups are
/// rebound onto the request before each handler runs. When nothing matches
/// the response defaults to 404.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pattern/handler pair. Routes are immutable once the
    /// server runs.
    pub fn add<H>(&mut self, pattern: &str, handler: H) -> anyhow::Result<()>
    where
        H: Fn(&Request, &mut Response) + Send + Sync + 'static,
    {
        let pattern = Regex::new(pattern)
            .with_context(|| format!("invalid route pattern {:?}", pattern))?;
        self.routes.push(Route {
            pattern,
            handler: Box::new(handler),
        });
        Ok(())
    }

    pub fn dispatch(&self, request: &mut Request, response: &mut Response) {
        let mut matched = false;
        for route in &self.routes {
            if let Some(caps) = route.pattern.captures(&request.url) {
                request.captures = caps
                    .iter()
                    .skip(1)
                    .map(|c| c.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect();
                (route.handler)(request, response);
                matched = true;
            }
        }
        if !matched {
            response.status(404);
        }
    }
}
