//! # Errores del núcleo HTTP
//! src/error.rs
//!
//! Solo las fallas del transporte y las violaciones de contrato del programa
//! son errores. El input malformado del cliente nunca llega aquí: el parser
//! degrada a campos vacíos.

use thiserror::Error;

/// Result con el error del crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Falla de lectura o escritura en el transporte
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// Código numérico fuera del conjunto soportado
    #[error("invalid status code: {0}")]
    InvalidStatus(u16),

    /// Segundo commit sobre el mismo ResponseWriter
    #[error("response already committed")]
    AlreadyCommitted,

    /// Regex de un segmento `{name:regex}` que no compila
    #[error("invalid route pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Falla al serializar un body JSON
    #[error("failed to encode JSON body: {0}")]
    Json(#[from] serde_json::Error),
}
