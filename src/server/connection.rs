//! # Handler de Conexión
//! src/server/connection.rs
//!
//! Atiende una conexión completa: lee y parsea el request, decide entre 200 y
//! 206, escribe la cabecera y transmite el contenido en chunks hasta que el
//! cliente se va, el servidor se detiene o la fuente falla.
//!
//! ## Máquina de estados
//!
//! ```text
//! AwaitingHeaders -> HeadersParsed -> SendingResponse -> ClosedNormal
//!        |                 |                 |
//!        +-----------------+-----------------+--------> ClosedError
//! ```
//!
//! ## Stream "en vivo"
//!
//! En modo [`LoopMode::Restart`] la fuente se reabre desde el inicio al
//! llegar a EOF, de modo que el cliente ve un stream que nunca termina. Si la
//! fuente recién reabierta tampoco tiene datos, el streaming se aborta.

use crate::config::Config;
use crate::error::{is_disconnect, ConnectionError};
use crate::http::range::{self, RangeState};
use crate::http::request::{read_header_block, FramingError, Request};
use crate::http::{ResponseHead, StatusCode};
use crate::metrics::StreamMetrics;
use crate::server::events::ConnectionOutcome;
use crate::server::shutdown::Shutdown;
use crate::source::ContentSource;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::time::Duration;

/// Qué hacer cuando la fuente llega a EOF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Reabrir la fuente y seguir enviando (simula stream en vivo)
    Restart,
    /// Terminar la respuesta
    Once,
}

/// Estado de una conexión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitingHeaders,
    HeadersParsed,
    SendingResponse,
    ClosedNormal,
    ClosedError,
}

/// Parámetros de streaming, fijos durante la vida del servidor
#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub chunk_size: usize,
    pub header_buffer_size: usize,
    pub idle_pause: Duration,
    pub loop_mode: LoopMode,
}

impl StreamSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size,
            header_buffer_size: config.header_buffer_size,
            idle_pause: config.idle_pause(),
            loop_mode: config.loop_mode(),
        }
    }
}

/// Resultado de atender una conexión
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionReport {
    pub status: Option<StatusCode>,
    pub bytes_sent: u64,
    pub outcome: ConnectionOutcome,
    pub state: ConnectionState,
}

/// Contexto de un request: vive solo durante la conexión
#[derive(Debug)]
struct RequestContext {
    request: Request,
    range: RangeState,
}

/// Handler de una conexión
pub struct ConnectionHandler<'a, C, S> {
    conn: &'a mut C,
    source: &'a mut S,
    settings: &'a StreamSettings,
    shutdown: &'a Shutdown,
    metrics: &'a StreamMetrics,
    state: ConnectionState,
    status: Option<StatusCode>,
    bytes_sent: u64,
}

impl<'a, C, S> ConnectionHandler<'a, C, S>
where
    C: Read + Write,
    S: ContentSource,
{
    pub fn new(
        conn: &'a mut C,
        source: &'a mut S,
        settings: &'a StreamSettings,
        shutdown: &'a Shutdown,
        metrics: &'a StreamMetrics,
    ) -> Self {
        Self {
            conn,
            source,
            settings,
            shutdown,
            metrics,
            state: ConnectionState::AwaitingHeaders,
            status: None,
            bytes_sent: 0,
        }
    }

    /// Atiende la conexión hasta el final
    ///
    /// Nunca devuelve error: todo fallo queda contenido en la conexión y se
    /// reporta en el `ConnectionReport`.
    pub fn run(mut self) -> ConnectionReport {
        let outcome = match self.serve() {
            Ok(outcome) => outcome,
            Err(error) => self.classify(error),
        };

        self.state = if outcome.is_normal() {
            ConnectionState::ClosedNormal
        } else {
            ConnectionState::ClosedError
        };

        ConnectionReport {
            status: self.status,
            bytes_sent: self.bytes_sent,
            outcome,
            state: self.state,
        }
    }

    /// Convierte un error en la forma de terminar la conexión
    fn classify(&self, error: ConnectionError) -> ConnectionOutcome {
        if self.shutdown.is_triggered() {
            tracing::debug!(error = %error, "conexión interrumpida por stop");
            return ConnectionOutcome::Stopped;
        }

        match &error {
            ConnectionError::Io(e) | ConnectionError::Framing(FramingError::Io(e)) if is_disconnect(e) => {
                tracing::info!(reason = %e, "cliente desconectado");
                ConnectionOutcome::ClientDisconnected
            }
            _ => {
                tracing::error!(error = %error, state = ?self.state, "error atendiendo conexión");
                ConnectionOutcome::Failed(error.to_string())
            }
        }
    }

    fn serve(&mut self) -> Result<ConnectionOutcome, ConnectionError> {
        let ctx = match self.read_request() {
            Ok(Some(ctx)) => ctx,
            Ok(None) => return Ok(ConnectionOutcome::Empty),
            Err(rejection) => return rejection,
        };
        self.state = ConnectionState::HeadersParsed;

        let mut stream = self.source.open_stream()?;
        let true_length = u64::try_from(self.source.length(true)).unwrap_or(0);

        if ctx.range.is_range_request && ctx.range.skip_bytes >= true_length {
            let error = ConnectionError::RangeOutOfBounds {
                start: ctx.range.skip_bytes,
                length: true_length,
            };
            tracing::warn!(error = %error, "rango fuera del archivo");
            let head = ResponseHead::empty(StatusCode::RangeNotSatisfiable)
                .with_header("Content-Range", format!("bytes */{}", true_length));
            return Ok(self.reject(head));
        }

        let head = ResponseHead::stream(
            &ctx.range,
            self.source.content_type(),
            self.source.length(false),
            true_length,
        );
        tracing::debug!(status = %head.status(), path = ctx.request.path(), "enviando cabecera");

        self.conn.write_all(&head.to_bytes())?;
        self.conn.flush()?;
        self.status = Some(head.status());
        self.state = ConnectionState::SendingResponse;

        stream.seek(SeekFrom::Start(ctx.range.skip_bytes))?;
        self.stream_body(stream, ctx)
    }

    /// Framing, parsing y resolución de rango
    ///
    /// `Ok(None)` si el peer cerró sin enviar nada; `Err` lleva la respuesta
    /// de rechazo ya enviada.
    #[allow(clippy::type_complexity)]
    fn read_request(
        &mut self,
    ) -> Result<Option<RequestContext>, Result<ConnectionOutcome, ConnectionError>> {
        let block = match read_header_block(&mut *self.conn, self.settings.header_buffer_size) {
            Ok(block) => block,
            Err(FramingError::PeerClosed) => {
                if self.shutdown.is_triggered() {
                    return Err(Ok(ConnectionOutcome::Stopped));
                }
                tracing::debug!("peer cerró sin enviar request");
                return Ok(None);
            }
            Err(e @ FramingError::Io(_)) => return Err(Err(e.into())),
            Err(e) => {
                if self.shutdown.is_triggered() {
                    return Err(Ok(ConnectionOutcome::Stopped));
                }
                tracing::warn!(error = %e, "bloque de headers inválido");
                return Err(Ok(self.reject(ResponseHead::empty(StatusCode::BadRequest))));
            }
        };

        let request = match Request::parse(&block) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "request mal formado");
                return Err(Ok(self.reject(ResponseHead::empty(StatusCode::BadRequest))));
            }
        };

        tracing::info!(
            method = request.method(),
            path = request.path(),
            range = request.header("range").unwrap_or("-"),
            "request"
        );
        for (name, value) in request.headers() {
            tracing::trace!(header = %name, value = %value);
        }

        if request.method() != "GET" {
            let error = ConnectionError::MethodNotAllowed(request.method().to_string());
            tracing::warn!(error = %error, "método rechazado");
            let head = ResponseHead::empty(StatusCode::MethodNotAllowed).with_header("Allow", "GET");
            return Err(Ok(self.reject(head)));
        }

        let range = match range::resolve(request.headers()) {
            Ok(range) => range,
            Err(e) => {
                tracing::warn!(error = %e, "header Range inválido");
                return Err(Ok(self.reject(ResponseHead::empty(StatusCode::RangeNotSatisfiable))));
            }
        };

        Ok(Some(RequestContext { request, range }))
    }

    /// Envía una cabecera de error sin body
    fn reject(&mut self, head: ResponseHead) -> ConnectionOutcome {
        let status = head.status();
        let sent = self
            .conn
            .write_all(&head.to_bytes())
            .and_then(|_| self.conn.flush());
        if let Err(e) = sent {
            tracing::debug!(error = %e, "no se pudo enviar la respuesta de error");
        }
        self.status = Some(status);
        ConnectionOutcome::Rejected(status)
    }

    /// Loop de streaming
    fn stream_body(
        &mut self,
        mut stream: S::Stream,
        mut ctx: RequestContext,
    ) -> Result<ConnectionOutcome, ConnectionError> {
        let mut buffer = vec![0u8; self.settings.chunk_size];

        while !self.shutdown.is_triggered() {
            let read = match read_chunk(&mut stream, &mut buffer)? {
                Some(read) => read,
                None => {
                    // La fuente no tiene datos todavía
                    tracing::debug!(idle = ?self.settings.idle_pause, "sin datos; esperando");
                    self.shutdown.wait_timeout(self.settings.idle_pause);
                    continue;
                }
            };

            let read = if read > 0 {
                read
            } else {
                match self.settings.loop_mode {
                    LoopMode::Once => {
                        tracing::info!(bytes = self.bytes_sent, "fin del contenido");
                        return Ok(ConnectionOutcome::Completed);
                    }
                    LoopMode::Restart => {
                        tracing::debug!("EOF; reabriendo la fuente para simular stream en vivo");
                        drop(stream);
                        stream = self.source.open_stream()?;
                        self.metrics.loop_restarted();

                        match read_chunk(&mut stream, &mut buffer)? {
                            Some(0) => return Err(ConnectionError::LoopReopen),
                            Some(read) => read,
                            None => continue,
                        }
                    }
                }
            };

            self.conn.write_all(&buffer[..read])?;
            self.conn.flush()?;

            ctx.range.skip_bytes += read as u64;
            self.bytes_sent += read as u64;
        }

        tracing::info!(
            bytes = self.bytes_sent,
            position = ctx.range.skip_bytes,
            "streaming detenido por stop"
        );
        Ok(ConnectionOutcome::Stopped)
    }
}

/// Lee un chunk; `None` cuando la fuente no tiene datos disponibles aún
fn read_chunk<R: Read>(stream: &mut R, buffer: &mut [u8]) -> io::Result<Option<usize>> {
    loop {
        match stream.read(buffer) {
            Ok(n) => return Ok(Some(n)),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
            Err(e) => return Err(e),
        }
    }
}
