use hearth::config::ServerConfig;
use hearth::http::server::HttpServer;
use hearth::http::static_files;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = ServerConfig::load();
    let mut server = HttpServer::bind(&cfg)?;

    server.route("^/$", |_req, out| {
        let _ = out.add_header("Content-Type", "text/html; charset=utf-8");
        out.body("Hello, world!\n");
    })?;

    server.route("^/echo$", |req, out| {
        out.body(&req.body);
    })?;

    server.route("^/upload/(.+)$", |req, out| {
        for file in &req.files {
            out.body(format!(
                "Got filename: {} with size {} bytes\n",
                file.filename,
                file.body.len()
            ));
        }
    })?;

    if let Some(root) = cfg.static_root.clone() {
        server.route("^/static/(.+)$", move |req, out| {
            match req.capture(0) {
                Some(rel) if !rel.contains("..") => {
                    static_files::serve(&root.join(rel), out);
                }
                _ => {
                    out.status(404);
                }
            }
        })?;
    }

    server.run()
}
