//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Un trie de segmentos por método HTTP. Se construye una sola vez al
//! arrancar (`&mut Router`) y después solo se lee (`&Router`).
//!
//! ## Arquitectura
//!
//! ```text
//! Request → Router::dispatch(method, path, args) → Handler(Request, ResponseWriter)
//! ```
//!
//! ## Sintaxis de patrones
//!
//! - `/status` - segmento literal
//! - `/{file}` - parámetro que acepta cualquier segmento
//! - `/sum/{a:\d+}` - parámetro restringido por regex (match completo)
//!
//! En un mismo nivel los literales se prueban antes que los parámetros, y
//! entre parámetros gana el primero registrado cuya regex haga match.

pub mod pattern;
mod trie;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::http::{Request, ResponseWriter};
use crate::util::ParamMap;
use trie::Trie;

/// Tipo de handler
///
/// Recibe el request (solo lectura) y el writer de la respuesta; debe hacer
/// exactamente un commit antes de retornar.
pub type Handler = Arc<dyn Fn(&Request, &mut ResponseWriter<'_>) + Send + Sync>;

/// Qué hacer cuando ninguna rama más profunda resuelve el path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Responde el leaf del último nodo alcanzado: `/a/b` sin handler propio
    /// resuelve al handler de `/a`
    #[default]
    Fallback,

    /// Solo un leaf en la profundidad exacta donde se consumió el path
    Strict,
}

/// Router que mapea (método, path) a handlers
pub struct Router {
    /// Método en minúsculas → trie
    tries: HashMap<String, Trie>,
    mode: MatchMode,
}

impl Router {
    /// Crea un router vacío en modo `Fallback`
    pub fn new() -> Self {
        Self::with_mode(MatchMode::default())
    }

    pub fn with_mode(mode: MatchMode) -> Self {
        Self {
            tries: HashMap::new(),
            mode,
        }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Registra una ruta con su handler
    ///
    /// # Errores
    ///
    /// `Error::InvalidPattern` si alguna regex no compila; el router queda
    /// sin cambios.
    ///
    /// # Ejemplo
    /// ```
    /// use ember_http::router::Router;
    /// use ember_http::http::{Request, ResponseWriter};
    ///
    /// let mut router = Router::new();
    /// router.add_route("GET", "/led/{level:\\d+}", |_req: &Request, res: &mut ResponseWriter<'_>| {
    ///     let _ = res.write_json();
    /// }).unwrap();
    ///
    /// let path = vec!["led".to_string(), "128".to_string()];
    /// let mut args = Default::default();
    /// assert!(router.dispatch("get", &path, &mut args).is_some());
    /// assert_eq!(args["level"], "128");
    /// ```
    pub fn add_route<H>(&mut self, method: &str, pattern: &str, handler: H) -> Result<()>
    where
        H: Fn(&Request, &mut ResponseWriter<'_>) + Send + Sync + 'static,
    {
        self.add_handler(method, pattern, Arc::new(handler))
    }

    /// Como `add_route`, con un handler ya compartido
    pub fn add_handler(&mut self, method: &str, pattern: &str, handler: Handler) -> Result<()> {
        let method = method.to_ascii_lowercase();
        let segments = pattern::parse_pattern(pattern);

        tracing::info!(method = %method, pattern = %pattern, "Agregando ruta");

        match self.tries.get_mut(&method) {
            Some(trie) => trie.settle(pattern, &segments, handler),
            None => {
                // Un patrón inválido no deja un método registrado sin rutas
                let mut trie = Trie::new();
                trie.settle(pattern, &segments, handler)?;
                self.tries.insert(method, trie);
                Ok(())
            }
        }
    }

    /// Resuelve el handler para `method` + `path`, llenando `args` con los
    /// parámetros capturados.
    ///
    /// `None` si el método no tiene rutas o ninguna aplica.
    pub fn dispatch(&self, method: &str, path: &[String], args: &mut ParamMap) -> Option<&Handler> {
        let method = method.to_ascii_lowercase();

        let Some(trie) = self.tries.get(&method) else {
            tracing::warn!(method = %method, "Método sin rutas");
            return None;
        };

        trie.dispatch(path, args, self.mode)
    }

    /// Cantidad de métodos con al menos una ruta
    pub fn method_count(&self) -> usize {
        self.tries.len()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
