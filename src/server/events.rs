//! # Eventos del Servidor
//! src/server/events.rs
//!
//! Canal observable de estado para la UI que controla el servidor. Los
//! callbacks se ejecutan en el thread que produce el evento (normalmente el
//! thread del servidor), así que deben ser rápidos.

use crate::http::StatusCode;
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};

/// Cómo terminó una conexión
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionOutcome {
    /// Se envió todo el contenido (modo sin loop)
    Completed,

    /// El cliente cerró o reseteó la conexión
    ClientDisconnected,

    /// `stop()` interrumpió el streaming
    Stopped,

    /// Se respondió con un error 4xx sin body
    Rejected(StatusCode),

    /// El peer cerró antes de enviar un request
    Empty,

    /// Fallo de fuente o de I/O
    Failed(String),
}

impl ConnectionOutcome {
    /// ¿Terminación sin error?
    pub fn is_normal(&self) -> bool {
        matches!(
            self,
            ConnectionOutcome::Completed
                | ConnectionOutcome::ClientDisconnected
                | ConnectionOutcome::Stopped
                | ConnectionOutcome::Empty
        )
    }

    /// Etiqueta corta para métricas
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionOutcome::Completed => "completed",
            ConnectionOutcome::ClientDisconnected => "client_disconnected",
            ConnectionOutcome::Stopped => "stopped",
            ConnectionOutcome::Rejected(_) => "rejected",
            ConnectionOutcome::Empty => "empty",
            ConnectionOutcome::Failed(_) => "failed",
        }
    }
}

/// Evento de ciclo de vida o de conexión
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// `init()` dejó el socket escuchando
    Listening { url: String },

    /// El loop de accept arrancó
    Started,

    /// El loop de accept terminó
    Stopped,

    /// Cliente conectado
    ConnectionOpened { peer: SocketAddr },

    /// Cliente desconectado
    ConnectionClosed {
        peer: SocketAddr,
        status: Option<StatusCode>,
        bytes_sent: u64,
        outcome: ConnectionOutcome,
    },

    /// accept() falló por algo distinto de un timeout
    AcceptFailed { error: String },
}

type Listener = Arc<dyn Fn(&ServerEvent) + Send + Sync>;

/// Lista de suscriptores compartida con el thread del servidor
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<RwLock<Vec<Listener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega un callback
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&ServerEvent) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    /// Entrega el evento a todos los suscriptores
    pub fn emit(&self, event: ServerEvent) {
        // Copia de la lista para no llamar callbacks con el lock tomado
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(Arc::clone)
            .collect();

        for listener in listeners {
            listener(&event);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .listeners
            .read()
            .map(|l| l.len())
            .unwrap_or_default();
        f.debug_struct("EventBus").field("listeners", &count).finish()
    }
}
