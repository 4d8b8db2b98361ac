//! # Señal de Cancelación
//! src/server/shutdown.rs
//!
//! Señal compartida entre `stop()` y el thread del servidor.
//!
//! Tres cosas la observan:
//! - el loop de accept, entre cada intento de accept
//! - el loop de streaming, entre cada chunk
//! - la pausa sin datos, que se despierta en cuanto se dispara
//!
//! Para el socket bloqueado en read/write se registra un clon de la conexión
//! activa; al disparar la señal se le hace `shutdown(Both)`, lo que
//! desbloquea la operación en curso.

use std::net::{Shutdown as SocketShutdown, TcpStream};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct State {
    triggered: bool,
    active: Option<TcpStream>,
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<State>,
    cvar: Condvar,
}

/// Señal de cancelación clonable
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

impl Shutdown {
    /// Crea una señal sin disparar
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Un panic en otro thread no invalida un bool y un socket
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Dispara la señal y corta la conexión activa, si hay
    pub fn trigger(&self) {
        let mut state = self.lock();
        state.triggered = true;

        if let Some(stream) = state.active.take() {
            if let Err(e) = stream.shutdown(SocketShutdown::Both) {
                tracing::debug!(error = %e, "shutdown de la conexión activa falló");
            }
        }

        self.inner.cvar.notify_all();
    }

    /// ¿Ya se pidió detener?
    pub fn is_triggered(&self) -> bool {
        self.lock().triggered
    }

    /// Espera hasta `timeout` o hasta que se dispare la señal
    ///
    /// Devuelve `true` si la señal está disparada.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let state = self.lock();
        let (state, _) = self
            .inner
            .cvar
            .wait_timeout_while(state, timeout, |s| !s.triggered)
            .unwrap_or_else(PoisonError::into_inner);
        state.triggered
    }

    /// Registra la conexión en curso para poder interrumpirla
    ///
    /// Si la señal ya se disparó, la conexión se corta de inmediato.
    pub fn register(&self, stream: &TcpStream) {
        let clone = match stream.try_clone() {
            Ok(clone) => clone,
            Err(e) => {
                tracing::warn!(error = %e, "no se pudo clonar el socket; stop no lo interrumpirá");
                return;
            }
        };

        let mut state = self.lock();
        if state.triggered {
            let _ = clone.shutdown(SocketShutdown::Both);
        } else {
            state.active = Some(clone);
        }
    }

    /// Olvida la conexión registrada
    pub fn unregister(&self) {
        self.lock().active = None;
    }
}
