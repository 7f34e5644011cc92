//! # Transporte de bytes
//! src/server/transport.rs
//!
//! El núcleo solo necesita dos cosas de una conexión: recibir todos los bytes
//! de un request y enviar un buffer completo. `TcpTransport` lo implementa
//! sobre `std::net::TcpStream`; `MemoryTransport` sirve para tests.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

/// Colaborador de transporte de una conexión
pub trait Transport {
    /// Retorna todos los bytes de un request (vacío si el peer cerró sin enviar)
    fn receive(&mut self) -> io::Result<Vec<u8>>;

    /// Envía el buffer completo, bloqueando hasta que quede encolado
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// Transporte TCP bloqueante.
///
/// Lee hasta tener el bloque de headers completo más `Content-Length` bytes
/// de body, o hasta EOF, con un tope de `max_bytes`.
pub struct TcpTransport {
    stream: TcpStream,
    max_bytes: usize,
}

impl TcpTransport {
    pub fn new(stream: TcpStream, max_bytes: usize, read_timeout: Duration) -> io::Result<Self> {
        stream.set_read_timeout(Some(read_timeout))?;
        Ok(Self { stream, max_bytes })
    }

    /// Dirección del peer, o "unknown"
    pub fn peer(&self) -> String {
        self.stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

impl Transport for TcpTransport {
    fn receive(&mut self) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        let mut chunk = [0u8; 4096];
        let mut expected: Option<usize> = None;

        while data.len() < self.max_bytes {
            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..n]);

            if expected.is_none() {
                expected = request_len(&data);
            }

            if matches!(expected, Some(total) if data.len() >= total) {
                break;
            }
        }

        data.truncate(self.max_bytes);
        Ok(data)
    }

    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)?;
        self.stream.flush()
    }
}

/// Offset donde empieza el body (después de la primera línea vacía que
/// sigue a una línea con contenido)
pub(crate) fn header_end(data: &[u8]) -> Option<usize> {
    let mut line_start = 0;
    let mut seen_content = false;
    for (i, &byte) in data.iter().enumerate() {
        if byte != b'\n' {
            continue;
        }
        let line = &data[line_start..i];
        let blank = line.is_empty() || line == b"\r";
        // Las líneas vacías antes del request line no cierran el bloque
        if blank && seen_content {
            return Some(i + 1);
        }
        seen_content |= !blank;
        line_start = i + 1;
    }
    None
}

/// Tamaño total esperado (headers + body declarado), saturando en
/// `usize::MAX` ante un `Content-Length` absurdo
pub(crate) fn request_len(data: &[u8]) -> Option<usize> {
    let body_start = header_end(data)?;
    let body_len = content_length(&data[..body_start]).unwrap_or(0);
    Some(body_start.saturating_add(body_len))
}

/// Valor de `Content-Length` en un bloque de headers (sin distinguir mayúsculas)
pub(crate) fn content_length(head: &[u8]) -> Option<usize> {
    String::from_utf8_lossy(head).lines().skip(1).find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

/// Transporte en memoria: entrega `input` una vez y acumula cada `send`.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    input: Vec<u8>,
    sent: Vec<Vec<u8>>,
    fail: bool,
}

impl MemoryTransport {
    pub fn new(input: impl Into<Vec<u8>>) -> Self {
        Self {
            input: input.into(),
            sent: Vec::new(),
            fail: false,
        }
    }

    /// Transporte cuyas lecturas y escrituras fallan
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Cada llamada a `send`, en orden
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Todo lo enviado, concatenado
    pub fn output(&self) -> Vec<u8> {
        self.sent.concat()
    }

    /// Todo lo enviado, como texto
    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output()).into_owned()
    }
}

impl Transport for MemoryTransport {
    fn receive(&mut self) -> io::Result<Vec<u8>> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"));
        }
        Ok(std::mem::take(&mut self.input))
    }

    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
        }
        self.sent.push(bytes.to_vec());
        Ok(())
    }
}
