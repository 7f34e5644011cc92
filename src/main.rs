//! # Ember HTTP - Entry Point
//! src/main.rs
//!
//! Servidor de demostración: registra unas cuantas rutas que muestran
//! segmentos literales, parámetros `{name}` y parámetros con regex, y sirve
//! archivos estáticos desde `--static-dir`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ember_http::config::Config;
use ember_http::http::{param, Request, ResponseWriter, StatusCode};
use ember_http::router::Router;
use ember_http::server::Server;

#[derive(Serialize)]
struct Status {
    status: &'static str,
    version: &'static str,
}

fn status(_req: &Request, res: &mut ResponseWriter<'_>) {
    let body = Status {
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
    };
    if let Err(e) = res.json(&body) {
        tracing::error!(error = %e, "No se pudo enviar /status");
    }
}

fn echo(req: &Request, res: &mut ResponseWriter<'_>) {
    let word = req.arg("word").unwrap_or_default();
    let _ = write!(res, "{}", word);
    if let Err(e) = res.write_file("text/plain") {
        tracing::error!(error = %e, "No se pudo enviar /echo");
    }
}

fn sum(req: &Request, res: &mut ResponseWriter<'_>) {
    let result = match (param::<u64>(req.args(), "a"), param::<u64>(req.args(), "b")) {
        (Some(a), Some(b)) => a.checked_add(b),
        _ => None,
    };

    let sent = match result {
        Some(total) => res.json(&serde_json::json!({ "sum": total })),
        // \d+ garantiza dígitos pero no que quepan en u64
        None => res.write_error(StatusCode::BadRequest),
    };
    if let Err(e) = sent {
        tracing::error!(error = %e, "No se pudo enviar /sum");
    }
}

fn form(req: &Request, res: &mut ResponseWriter<'_>) {
    let body = serde_json::json!({
        "form": req.form(),
        "files": req.files(),
    });
    if let Err(e) = res.json(&body) {
        tracing::error!(error = %e, "No se pudo enviar /form");
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

fn serve_static(root: &Path, req: &Request, res: &mut ResponseWriter<'_>) {
    let name = req.arg("file").unwrap_or_default();
    if name.is_empty() || name.starts_with('.') {
        let _ = res.write_error(StatusCode::Forbidden);
        return;
    }

    let path = root.join(name);
    let contents = match std::fs::read(&path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Archivo no disponible");
            let _ = res.write_error(StatusCode::NotFound);
            return;
        }
    };

    let mime = mime_for(&path);
    let accepts_gzip = req
        .header_ignore_case("Accept-Encoding")
        .is_some_and(|value| value.contains("gzip"));

    let sent = res.set_body(contents).and_then(|_| {
        if accepts_gzip && mime.starts_with("text/") {
            res.write_compressed(mime)
        } else {
            res.write_cached(mime)
        }
    });
    if let Err(e) = sent {
        tracing::error!(path = %path.display(), error = %e, "No se pudo enviar el archivo");
    }
}

fn build_router(config: &Config) -> ember_http::Result<Router> {
    let mut router = Router::with_mode(config.match_mode());

    router.add_route("GET", "/status", status)?;
    router.add_route("GET", "/echo/{word}", echo)?;
    router.add_route("GET", "/sum/{a:\\d+}/{b:\\d+}", sum)?;
    router.add_route("POST", "/form", form)?;

    let root = Arc::new(PathBuf::from(&config.static_dir));
    router.add_route("GET", "/{file}", move |req: &Request, res: &mut ResponseWriter<'_>| {
        serve_static(&root, req, res)
    })?;

    Ok(router)
}

fn main() {
    let config = Config::new();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("ember_http v{} arrancando", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Configuración inválida");
        std::process::exit(1);
    }
    config.print_summary();

    let router = match build_router(&config) {
        Ok(router) => router,
        Err(e) => {
            tracing::error!(error = %e, "No se pudieron registrar las rutas");
            std::process::exit(1);
        }
    };

    let mut server = Server::new(config, router);

    // Bloquea el thread principal
    if let Err(e) = server.run() {
        tracing::error!(error = %e, "Error fatal");
        std::process::exit(1);
    }
}
