use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use tracing::{debug, warn};

use crate::http::response::Response;

const CHUNK_SIZE: usize = 8 * 1024;

/// Serves a resolved filesystem path onto a response: the file is read in
/// fixed-size chunks appended with `Response::body`; an open failure turns
/// into a 404.
pub fn serve(path: &Path, response: &mut Response) {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!("can't open {}: {}", path.display(), e);
            response.status(404);
            return;
        }
    };

    if let Some(mime) = guess_mime(path) {
        let _ = response.add_header("Content-Type", mime);
    }

    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        match file.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                response.body(&chunk[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("read failed for {}: {}", path.display(), e);
                break;
            }
        }
    }
}

fn guess_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    let mime = match ext {
        "htm" | "html" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "json" => "application/json",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    };
    Some(mime)
}
