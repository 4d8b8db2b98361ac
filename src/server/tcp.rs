//! # Servidor TCP de Streaming
//! src/server/tcp.rs
//!
//! Dueño del socket de escucha. Corre el loop de accept en un thread propio
//! y atiende **una conexión a la vez**: accept, respuesta completa, accept.
//! Es un límite de escalabilidad asumido: un reproductor por servidor.
//!
//! ## Ciclo de vida
//!
//! ```text
//! new() -> init(ip) -> start() -> stop() -> start() -> stop() ...
//! ```
//!
//! `init` deja el socket escuchando y devuelve la URL. `stop` libera el socket
//! y espera a que el thread termine; un `start` posterior vuelve a hacer bind
//! en la misma dirección y puerto.

use crate::config::Config;
use crate::error::{BindError, ServerError};
use crate::metrics::StreamMetrics;
use crate::server::connection::{ConnectionHandler, StreamSettings};
use crate::server::events::{EventBus, ServerEvent};
use crate::server::shutdown::Shutdown;
use crate::source::FileSource;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Granularidad con la que el accept no bloqueante revisa la señal de stop
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Servidor HTTP de un solo archivo
pub struct StreamServer {
    config: Config,
    source: FileSource,
    listener: Option<TcpListener>,
    local_addr: Option<SocketAddr>,
    running: Arc<AtomicBool>,
    shutdown: Shutdown,
    thread: Option<JoinHandle<()>>,
    metrics: StreamMetrics,
    events: EventBus,
}

impl StreamServer {
    pub fn new(config: Config) -> Self {
        let source = FileSource::new(config.file.clone(), config.content_type.clone());

        Self {
            config,
            source,
            listener: None,
            local_addr: None,
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Shutdown::new(),
            thread: None,
            metrics: StreamMetrics::new(),
            events: EventBus::new(),
        }
    }

    /// Prepara el socket de escucha y devuelve la URL base
    ///
    /// `bind_address` es una IP o hostname (el puerto sale de la
    /// configuración; 0 = lo elige el sistema operativo) o un `ip:puerto`
    /// completo.
    pub fn init(&mut self, bind_address: &str) -> Result<String, ServerError> {
        if self.is_running() {
            return Err(ServerError::AlreadyRunning);
        }

        let addr = resolve(bind_address, self.config.port)?;
        let listener = listen(addr)?;
        let local_addr = listener.local_addr().map_err(|source| BindError::Socket {
            address: addr.to_string(),
            source,
        })?;

        self.listener = Some(listener);
        self.local_addr = Some(local_addr);

        let url = format!("http://{}", local_addr);
        tracing::info!(url = %url, "servidor escuchando");
        self.events.emit(ServerEvent::Listening { url: url.clone() });
        Ok(url)
    }

    /// Arranca el loop de accept en su propio thread
    pub fn start(&mut self) -> Result<(), ServerError> {
        if self.is_running() || self.thread.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let listener = match (self.listener.take(), self.local_addr) {
            (Some(listener), _) => listener,
            (None, Some(addr)) => {
                tracing::debug!(addr = %addr, "re-bind del socket de escucha");
                listen(addr)?
            }
            (None, None) => return Err(ServerError::NotInitialized),
        };

        self.shutdown = Shutdown::new();
        self.running.store(true, Ordering::SeqCst);

        let accept_loop = AcceptLoop {
            listener,
            source: self.source.clone(),
            settings: StreamSettings::from_config(&self.config),
            accept_timeout: self.config.accept_timeout(),
            shutdown: self.shutdown.clone(),
            running: Arc::clone(&self.running),
            metrics: self.metrics.clone(),
            events: self.events.clone(),
        };

        let handle = thread::Builder::new()
            .name("filestream-accept".to_string())
            .spawn(move || accept_loop.run())
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                ServerError::Spawn(e)
            })?;

        self.thread = Some(handle);
        Ok(())
    }

    /// Detiene el servidor y espera a que el thread termine
    ///
    /// Interrumpe tanto el accept como una conexión en pleno streaming. Al
    /// volver, el puerto ya está libre.
    pub fn stop(&mut self) -> Result<(), ServerError> {
        let Some(handle) = self.thread.take() else {
            tracing::warn!("stop() sin start(); nada que detener");
            return Ok(());
        };

        tracing::info!("deteniendo servidor");
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.trigger();

        handle.join().map_err(|_| ServerError::ThreadPanicked)?;
        tracing::info!("servidor detenido");
        Ok(())
    }

    /// ¿Está corriendo el loop de accept?
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Puerto asignado (0 antes de `init`)
    pub fn port(&self) -> u16 {
        self.local_addr.map(|addr| addr.port()).unwrap_or(0)
    }

    /// Dirección real del socket
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// URL base, ej: `http://192.168.1.20:41235`
    pub fn listen_url(&self) -> Option<String> {
        self.local_addr.map(|addr| format!("http://{}", addr))
    }

    /// URL del archivo para pegar en un navegador o reproductor
    pub fn file_url(&self) -> Option<String> {
        self.listen_url()
            .map(|base| format!("{}/{}", base, self.source.file_name()))
    }

    /// Métricas compartidas con el thread del servidor
    pub fn metrics(&self) -> &StreamMetrics {
        &self.metrics
    }

    /// Suscribe un callback a los eventos del servidor
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&ServerEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener);
    }

    /// Configuración con la que se creó
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for StreamServer {
    fn drop(&mut self) {
        if self.thread.is_some() {
            if let Err(e) = self.stop() {
                tracing::error!(error = %e, "error deteniendo el servidor en drop");
            }
        }
    }
}

/// Resuelve `host` o `host:port` a una dirección concreta
fn resolve(bind_address: &str, port: u16) -> Result<SocketAddr, BindError> {
    if let Ok(addr) = bind_address.parse::<SocketAddr>() {
        return Ok(addr);
    }

    let mut addrs = (bind_address, port)
        .to_socket_addrs()
        .map_err(|source| BindError::Resolve {
            address: bind_address.to_string(),
            source,
        })?;

    addrs.next().ok_or_else(|| BindError::NoAddress {
        address: bind_address.to_string(),
    })
}

/// Bind + modo no bloqueante para poder cortar el accept
fn listen(addr: SocketAddr) -> Result<TcpListener, BindError> {
    let socket_error = |source: io::Error| BindError::Socket {
        address: addr.to_string(),
        source,
    };

    let listener = TcpListener::bind(addr).map_err(socket_error)?;
    listener.set_nonblocking(true).map_err(socket_error)?;
    Ok(listener)
}

/// Estado que se mueve al thread del servidor
struct AcceptLoop {
    listener: TcpListener,
    source: FileSource,
    settings: StreamSettings,
    accept_timeout: Duration,
    shutdown: Shutdown,
    running: Arc<AtomicBool>,
    metrics: StreamMetrics,
    events: EventBus,
}

impl AcceptLoop {
    fn run(self) {
        tracing::info!(file = %self.source.path().display(), "loop de accept iniciado");
        self.events.emit(ServerEvent::Started);

        while !self.shutdown.is_triggered() {
            match self.accept() {
                Ok(Some((stream, peer))) => self.serve(stream, peer),
                Ok(None) => {
                    tracing::trace!("ningún cliente conectado; esperando");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "error aceptando conexión");
                    self.metrics.accept_failed();
                    self.events.emit(ServerEvent::AcceptFailed {
                        error: e.to_string(),
                    });
                    // Evita un loop caliente si el error se repite
                    self.shutdown.wait_timeout(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        self.events.emit(ServerEvent::Stopped);
        tracing::info!("loop de accept terminado; socket liberado");
    }

    /// Espera un cliente hasta `accept_timeout`
    ///
    /// `Ok(None)` en timeout o si se pidió stop.
    fn accept(&self) -> io::Result<Option<(TcpStream, SocketAddr)>> {
        let deadline = Instant::now() + self.accept_timeout;

        loop {
            match self.listener.accept() {
                Ok(pair) => return Ok(Some(pair)),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Ok(None);
                    }
                    if self.shutdown.wait_timeout(remaining.min(ACCEPT_POLL_INTERVAL)) {
                        return Ok(None);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Atiende una conexión completa
    fn serve(&self, mut stream: TcpStream, peer: SocketAddr) {
        let span = tracing::info_span!("connection", %peer);
        let _guard = span.enter();

        // En BSD/macOS el socket aceptado hereda el modo no bloqueante
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!(error = %e, "no se pudo configurar el socket; cerrando");
            return;
        }
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "set_nodelay falló");
        }

        tracing::info!("cliente conectado");
        self.metrics.connection_opened();
        self.events.emit(ServerEvent::ConnectionOpened { peer });

        self.shutdown.register(&stream);
        let mut source = self.source.clone();
        let report = ConnectionHandler::new(
            &mut stream,
            &mut source,
            &self.settings,
            &self.shutdown,
            &self.metrics,
        )
        .run();
        self.shutdown.unregister();
        drop(stream);

        tracing::info!(
            status = report.status.map(|s| s.as_u16()).unwrap_or(0),
            bytes = report.bytes_sent,
            outcome = report.outcome.label(),
            "conexión cerrada"
        );

        self.metrics
            .connection_closed(report.status, &report.outcome, report.bytes_sent);
        self.events.emit(ServerEvent::ConnectionClosed {
            peer,
            status: report.status,
            bytes_sent: report.bytes_sent,
            outcome: report.outcome,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::sync::Mutex;

    fn test_config(file: &std::path::Path) -> Config {
        let mut config = Config::for_file(file);
        config.accept_timeout_ms = 200;
        config.idle_pause_ms = 20;
        config
    }

    #[test]
    fn test_resolve_forms() {
        assert_eq!(resolve("127.0.0.1", 0).unwrap().port(), 0);
        assert_eq!(resolve("127.0.0.1:8081", 0).unwrap().port(), 8081);
        assert_eq!(resolve("127.0.0.1", 9000).unwrap().port(), 9000);
        assert!(resolve("localhost", 0).is_ok());
    }

    #[test]
    fn test_init_reports_os_assigned_port() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut server = StreamServer::new(test_config(file.path()));

        assert_eq!(server.port(), 0);
        assert_eq!(server.file_url(), None);

        let url = server.init("127.0.0.1").unwrap();
        let port = server.port();

        assert_ne!(port, 0);
        assert_eq!(url, format!("http://127.0.0.1:{}", port));
        assert_eq!(server.listen_url().as_deref(), Some(url.as_str()));

        let name = file.path().file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(server.file_url(), Some(format!("{}/{}", url, name)));
        assert!(!server.is_running());
    }

    #[test]
    fn test_init_port_in_use() {
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut server = StreamServer::new(test_config(file.path()));

        let err = server
            .init(&taken.local_addr().unwrap().to_string())
            .unwrap_err();
        assert!(matches!(err, ServerError::Bind(BindError::Socket { .. })));
    }

    #[test]
    fn test_start_requires_init() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut server = StreamServer::new(test_config(file.path()));
        assert!(matches!(server.start(), Err(ServerError::NotInitialized)));
    }

    #[test]
    fn test_double_start_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut server = StreamServer::new(test_config(file.path()));
        server.init("127.0.0.1").unwrap();

        server.start().unwrap();
        assert!(server.is_running());
        assert!(matches!(server.start(), Err(ServerError::AlreadyRunning)));

        server.stop().unwrap();
        assert!(!server.is_running());
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut server = StreamServer::new(test_config(file.path()));
        assert!(server.stop().is_ok());
    }

    #[test]
    fn test_events_and_single_request() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();
        file.flush().unwrap();

        let mut config = test_config(file.path());
        config.no_loop = true;
        let mut server = StreamServer::new(config);

        let events = Arc::new(Mutex::new(Vec::new()));
        {
            let events = Arc::clone(&events);
            server.subscribe(move |event| events.lock().unwrap().push(event.clone()));
        }

        server.init("127.0.0.1").unwrap();
        server.start().unwrap();

        let mut client = TcpStream::connect(server.local_addr().unwrap()).unwrap();
        client.write_all(b"GET / HTTP/1.1\r\nRange: bytes=4-\r\n\r\n").unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).unwrap();
        assert!(response.ends_with(b"456789"));

        server.stop().unwrap();

        let events = events.lock().unwrap();
        assert!(matches!(events.first(), Some(ServerEvent::Listening { .. })));
        assert!(events.contains(&ServerEvent::Started));
        assert!(events.iter().any(|e| matches!(
            e,
            ServerEvent::ConnectionClosed { bytes_sent: 6, .. }
        )));
        assert_eq!(events.last(), Some(&ServerEvent::Stopped));

        let snapshot = server.metrics().snapshot();
        assert_eq!(snapshot.connections, 1);
        assert_eq!(snapshot.status_codes.get(&206), Some(&1));
    }
}
