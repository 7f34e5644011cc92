//! # Ember HTTP
//! src/lib.rs
//!
//! Núcleo HTTP embebible: un parser de requests, un router basado en trie
//! con segmentos restringidos por regex y un escritor de respuestas de un
//! solo envío.
//!
//! ## Arquitectura
//!
//! - `http`: parsing del request y construcción de la respuesta
//! - `router`: trie de segmentos por método, con backtracking
//! - `server`: transporte TCP y ciclo de vida de una conexión
//! - `config`: argumentos CLI y variables de entorno
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use ember_http::config::Config;
//! use ember_http::http::{Request, ResponseWriter, StatusCode};
//! use ember_http::router::Router;
//! use ember_http::server::Server;
//! use std::io::Write;
//!
//! let mut router = Router::new();
//! router
//!     .add_route("GET", "/hello/{name}", |req: &Request, res: &mut ResponseWriter<'_>| {
//!         let _ = write!(res, "hola {}", req.arg("name").unwrap_or("?"));
//!         let _ = res.commit(StatusCode::Ok);
//!     })
//!     .expect("patrón válido");
//!
//! let mut server = Server::new(Config::default(), router);
//! server.run().expect("Error al iniciar servidor");
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod router;
pub mod server;
pub mod util;

pub use error::{Error, Result};
