//! # Servidor TCP secuencial
//! src/server/tcp.rs
//!
//! Un request a la vez: se acepta una conexión, se parsea, se despacha, el
//! handler responde y se cierra antes de aceptar la siguiente.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::{Duration, Instant};

use super::transport::{TcpTransport, Transport};
use crate::config::Config;
use crate::error::Result;
use crate::http::{Request, ResponseWriter, StatusCode};
use crate::router::Router;
use crate::util::ParamMap;

/// Servidor HTTP dueño de su configuración y su router
pub struct Server {
    config: Config,
    router: Router,
    listener: Option<TcpListener>,
}

impl Server {
    pub fn new(config: Config, router: Router) -> Self {
        Self {
            config,
            router,
            listener: None,
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Abre el listener (si no estaba abierto) y retorna la dirección real
    ///
    /// Útil con puerto 0 en tests.
    pub fn bind(&mut self) -> Result<SocketAddr> {
        if self.listener.is_none() {
            let address = self.config.address();
            tracing::info!(address = %address, "Iniciando servidor");
            self.listener = Some(TcpListener::bind(&address)?);
        }

        match &self.listener {
            Some(listener) => Ok(listener.local_addr()?),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "server not bound").into()),
        }
    }

    /// Loop de accept. Los errores de una conexión se registran y el
    /// servidor sigue con la siguiente.
    pub fn run(&mut self) -> Result<()> {
        let address = self.bind()?;
        tracing::info!(address = %address, "Servidor escuchando, una conexión a la vez");

        let Some(listener) = &self.listener else {
            return Ok(());
        };

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Err(e) = self.serve(stream) {
                        tracing::error!(error = %e, "Error en conexión");
                    }
                }
                Err(e) => tracing::error!(error = %e, "Error al aceptar conexión"),
            }
        }

        Ok(())
    }

    /// Acepta y atiende exactamente una conexión
    pub fn accept_one(&self) -> Result<()> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "server not bound"))?;

        let (stream, _) = listener.accept()?;
        self.serve(stream)
    }

    fn serve(&self, stream: TcpStream) -> Result<()> {
        let mut transport = TcpTransport::new(
            stream,
            self.config.max_request_bytes,
            Duration::from_millis(self.config.read_timeout_ms),
        )?;
        tracing::debug!(peer = %transport.peer(), "Nueva conexión");

        self.handle_connection(&mut transport)
    }

    /// Ciclo de vida completo de un request sobre un transporte ya abierto.
    ///
    /// Las fallas del transporte se propagan; sin ruta se responde 404.
    pub fn handle_connection(&self, transport: &mut dyn Transport) -> Result<()> {
        let start = Instant::now();

        let raw = transport.receive()?;
        if raw.is_empty() {
            tracing::debug!("Conexión cerrada sin datos");
            return Ok(());
        }

        let mut request = Request::parse(&raw);
        tracing::info!(method = %request.method(), uri = %request.uri(), bytes = raw.len(), "Request");

        let mut args = ParamMap::new();
        let handler = self.router.dispatch(request.method(), request.path(), &mut args);
        request.set_args(args);

        let mut response = ResponseWriter::new(transport);
        match handler {
            Some(handler) => handler(&request, &mut response),
            None => {
                tracing::warn!(method = %request.method(), uri = %request.uri(), "Ruta no encontrada");
                // Una falla aquí queda registrada en el writer y sale por finish()
                let _ = response.write_error(StatusCode::NotFound);
            }
        }
        response.finish()?;

        tracing::info!(
            uri = %request.uri(),
            latency_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Respuesta enviada"
        );
        Ok(())
    }
}
