//! # Módulo HTTP
//!
//! Parser de requests y escritor de respuestas del núcleo embebido:
//!
//! - Parsing del request line, headers, query string y fragmento
//! - Decodificación de bodies url-encoded y multipart/form-data
//! - Construcción y envío de la respuesta (single-shot)
//! - Tabla fija de status codes
//!
//! No hay keep-alive, chunked encoding ni bodies en streaming: el request
//! completo se bufferea antes de parsear.

pub mod multipart; // Bodies multipart/form-data
pub mod request;   // Parsing de requests
pub mod response;  // ResponseWriter
pub mod status;    // Códigos de estado

pub use request::{dump_params, dump_path, param, Request};
pub use response::ResponseWriter;
pub use status::StatusCode;
