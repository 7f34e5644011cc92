//! # Escritura de Respuestas HTTP
//! src/http/response.rs
//!
//! El handler acumula bytes de body y headers en un `ResponseWriter` y llama
//! exactamente una operación de commit. El commit calcula `Content-Length`,
//! arma el status line y envía headers y body al transporte.
//!
//! ## Formato producido
//!
//! ```text
//! HTTP/1.1 200 OK\n
//! Content-Length: 13\n
//! Content-type: application/json\n
//! \n
//! {"ok": true}
//! ```
//!
//! ## Ejemplo de uso
//!
//! ```
//! use std::io::Write;
//! use ember_http::http::{ResponseWriter, StatusCode};
//! use ember_http::server::MemoryTransport;
//!
//! let mut transport = MemoryTransport::new(Vec::new());
//! let mut response = ResponseWriter::new(&mut transport);
//! write!(response, "abc").unwrap();
//! response.commit(StatusCode::Ok).unwrap();
//!
//! assert!(transport.output_string().ends_with("Content-Length: 3\n\nabc"));
//! ```

use std::collections::BTreeMap;
use std::io::{self, Write};

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;

use super::StatusCode;
use crate::error::{Error, Result};
use crate::server::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Committed,
    /// El commit falló en el transporte
    Failed(io::ErrorKind),
}

/// Buffer de salida de un request, de un solo uso
pub struct ResponseWriter<'t> {
    transport: &'t mut dyn Transport,

    /// Ordenados por nombre al serializar
    headers: BTreeMap<String, String>,

    body: Vec<u8>,

    state: State,
}

impl<'t> ResponseWriter<'t> {
    pub fn new(transport: &'t mut dyn Transport) -> Self {
        Self {
            transport,
            headers: BTreeMap::new(),
            body: Vec::new(),
            state: State::Open,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Agrega o sobrescribe un header. Después del commit se ignora.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if self.state != State::Open {
            tracing::warn!(header = %name, "Header ignorado: la respuesta ya fue enviada");
            return;
        }
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Bytes acumulados hasta ahora
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Reemplaza el body completo
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) -> Result<()> {
        self.ensure_open()?;
        self.body = body.into();
        Ok(())
    }

    pub fn is_committed(&self) -> bool {
        self.state != State::Open
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == State::Open {
            Ok(())
        } else {
            Err(Error::AlreadyCommitted)
        }
    }

    /// Commit terminal: status line, headers, línea vacía y body.
    ///
    /// Headers y body salen en dos escrituras, en ese orden.
    pub fn commit(&mut self, status: StatusCode) -> Result<()> {
        self.ensure_open()?;

        // Un Content-Length puesto por el handler, en cualquier caso, se reemplaza
        self.headers
            .retain(|name, _| !name.eq_ignore_ascii_case("content-length"));
        self.headers
            .insert("Content-Length".to_string(), self.body.len().to_string());
        let head = self.render_head(status);

        match self.send_all(&head) {
            Ok(()) => {
                self.state = State::Committed;
                tracing::debug!(status = %status, bytes = self.body.len(), "Respuesta enviada");
                Ok(())
            }
            Err(e) => {
                self.state = State::Failed(e.kind());
                Err(Error::Io(e))
            }
        }
    }

    /// Commit con un código numérico; fuera del conjunto soportado es un
    /// error del programa y no se envía nada.
    pub fn commit_code(&mut self, code: u16) -> Result<()> {
        match StatusCode::from_u16(code) {
            Some(status) => self.commit(status),
            None => {
                tracing::error!(code, "Commit con código de estado inválido");
                Err(Error::InvalidStatus(code))
            }
        }
    }

    fn send_all(&mut self, head: &[u8]) -> io::Result<()> {
        self.transport.send(head)?;
        self.transport.send(&self.body)
    }

    fn render_head(&self, status: StatusCode) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {}\n", status);
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\n", name, value));
        }
        head.push('\n');
        head.into_bytes()
    }

    // === Presets ===

    /// Respuesta de error; si hay body se envía como HTML
    pub fn write_error(&mut self, status: StatusCode) -> Result<()> {
        if !self.body.is_empty() {
            self.set_header("Content-type", "text/html");
        }
        self.commit(status)
    }

    pub fn write_file(&mut self, mime: &str) -> Result<()> {
        self.set_header("Content-type", mime);
        self.commit(StatusCode::Ok)
    }

    /// El body ya está comprimido con gzip
    pub fn write_gzip(&mut self, mime: &str) -> Result<()> {
        self.set_header("Content-type", mime);
        self.set_header("Accept-Ranges", "bytes");
        self.set_header("Content-Encoding", "gzip");
        self.commit(StatusCode::Ok)
    }

    /// Comprime el body pendiente con gzip y lo envía como `write_gzip`
    pub fn write_compressed(&mut self, mime: &str) -> Result<()> {
        self.ensure_open()?;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&self.body)?;
        self.body = encoder.finish()?;

        self.write_gzip(mime)
    }

    /// JSON sin cache
    pub fn write_json(&mut self) -> Result<()> {
        self.set_header("Content-type", "application/json");
        self.set_header("Cache-Control", "no-store, no-cache, must-revalidate, max-age=0");
        self.set_header("Pragma", "no-cache");
        self.commit(StatusCode::Ok)
    }

    /// Serializa `value` como body y lo envía con `write_json`
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.ensure_open()?;
        self.body = serde_json::to_vec(value)?;
        self.write_json()
    }

    /// Recurso estático con cache de un año
    pub fn write_cached(&mut self, mime: &str) -> Result<()> {
        self.set_header("Content-type", mime);
        self.set_header("Cache-Control", "public, max-age=31536000");
        self.commit(StatusCode::Ok)
    }

    /// Cierra el ciclo de vida del writer.
    ///
    /// Si el handler no hizo commit se responde 500; si el commit falló en
    /// el transporte, ese error se devuelve aquí.
    pub fn finish(mut self) -> Result<()> {
        match self.state {
            State::Committed => Ok(()),
            State::Failed(kind) => Err(Error::Io(io::Error::new(kind, "response commit failed"))),
            State::Open => {
                tracing::warn!("El handler no envió respuesta, se responde 500");
                self.body.clear();
                self.commit(StatusCode::InternalServerError)
            }
        }
    }
}

/// El body es un buffer de solo-append; después del commit escribir falla
impl Write for ResponseWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.state != State::Open {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "response already committed",
            ));
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
