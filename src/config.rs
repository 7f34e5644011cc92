//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor embebido con soporte para argumentos CLI y
//! variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./ember_http --port 8080 \
//!   --max-request-bytes 65536 \
//!   --read-timeout-ms 2000 \
//!   --strict-routing
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=0.0.0.0 ./ember_http
//! ```

use clap::Parser;

use crate::router::MatchMode;

/// Configuración del servidor HTTP embebido
#[derive(Debug, Clone, Parser)]
#[command(name = "ember_http")]
#[command(about = "Núcleo HTTP embebido: parser, router por trie y respuestas")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    // === Lectura del request ===

    /// Tamaño máximo de un request; lo que exceda se descarta
    #[arg(long = "max-request-bytes", default_value = "16384", env = "MAX_REQUEST_BYTES")]
    pub max_request_bytes: usize,

    /// Timeout de lectura del socket en milisegundos
    #[arg(long = "read-timeout-ms", default_value = "5000", env = "READ_TIMEOUT_MS")]
    pub read_timeout_ms: u64,

    // === Routing ===

    /// Sin fallback al leaf de un prefijo: solo el match exacto responde
    #[arg(long = "strict-routing", env = "STRICT_ROUTING")]
    pub strict_routing: bool,

    // === Logging y demo ===

    /// Filtro de tracing por defecto cuando no hay RUST_LOG
    #[arg(long = "log-level", default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Directorio servido por la ruta `/{file}` del binario
    #[arg(long = "static-dir", default_value = "./public", env = "STATIC_DIR")]
    pub static_dir: String,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use ember_http::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn match_mode(&self) -> MatchMode {
        if self.strict_routing {
            MatchMode::Strict
        } else {
            MatchMode::Fallback
        }
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("Host must not be empty".to_string());
        }
        if self.max_request_bytes == 0 {
            return Err("Max request bytes must be >= 1".to_string());
        }
        if self.read_timeout_ms == 0 {
            return Err("Read timeout must be > 0".to_string());
        }
        if self.log_level.trim().is_empty() {
            return Err("Log level must not be empty".to_string());
        }

        Ok(())
    }

    /// Registra un resumen de la configuración
    pub fn print_summary(&self) {
        tracing::info!(
            address = %self.address(),
            max_request_bytes = self.max_request_bytes,
            read_timeout_ms = self.read_timeout_ms,
            routing = ?self.match_mode(),
            static_dir = %self.static_dir,
            log_level = %self.log_level,
            "Configuración del servidor"
        );
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            max_request_bytes: 16 * 1024,
            read_timeout_ms: 5_000,
            strict_routing: false,
            log_level: "info".to_string(),
            static_dir: "./public".to_string(),
        }
    }
}
