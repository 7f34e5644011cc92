//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Este módulo implementa el servidor TCP que:
//! 1. Escucha en un puerto
//! 2. Acepta conexiones entrantes, una a la vez
//! 3. Lee el request completo a través de un `Transport`
//! 4. Despacha al router y envía la respuesta
//!
//! Cada conexión lleva exactamente un request y una respuesta.

pub mod tcp;
pub mod transport;

// Re-exportar para facilitar el uso
pub use tcp::Server;
pub use transport::{MemoryTransport, TcpTransport, Transport};
