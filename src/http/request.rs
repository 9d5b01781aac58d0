/// A header multimap: duplicate keys are allowed and insertion order is
/// preserved, both globally and within one key. Lookup is ASCII
/// case-insensitive, as HTTP header names are on the wire.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header without replacing earlier entries of the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Returns the first value for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value for `name` in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One `multipart/form-data` part that carried both a `name` and a
/// `filename` disposition parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// The form field name.
    pub name: String,
    /// The client-supplied file name.
    pub filename: String,
    /// The raw part payload.
    pub body: Vec<u8>,
}

/// A parsed HTTP request, handed to route handlers.
///
/// Built by the parser at message-complete and consumed by exactly one
/// dispatch; the router rebinds `captures` before each matching handler
/// runs.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// The request method, e.g. `"GET"`. Empty when the peer sent a method
    /// the tokenizer does not recognize.
    pub method: String,
    /// The raw request target, query string included.
    pub url: String,
    /// Request headers in arrival order.
    pub headers: HeaderMap,
    /// The fully buffered request body.
    pub body: Vec<u8>,
    /// Uploaded files extracted from a multipart body.
    pub files: Vec<FilePart>,
    /// Capture groups bound by the route pattern that matched.
    pub captures: Vec<String>,
}

impl Request {
    /// Returns the first value of the named header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Returns the nth route capture group, 0-based.
    pub fn capture(&self, index: usize) -> Option<&str> {
        self.captures.get(index).map(String::as_str)
    }
}
