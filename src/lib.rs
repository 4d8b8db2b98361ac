//! # filestream
//! src/lib.rs
//!
//! Servidor HTTP mínimo que expone **un solo archivo local** a clientes de la
//! LAN (un navegador, VLC, una smart TV) con soporte de seeking vía `Range`.
//!
//! Pensado para reproductores de video que piden el mismo archivo varias
//! veces con offsets distintos. Al llegar a EOF la fuente se reabre y se sigue
//! enviando, simulando un stream en vivo.
//!
//! ## Arquitectura
//!
//! - `http`: percent-decoding, parsing del request, rangos y cabeceras de respuesta
//! - `source`: la fuente de contenido (un archivo)
//! - `server`: socket, ciclo de vida, conexión y streaming
//! - `config`: argumentos CLI y variables de entorno
//! - `metrics`: contadores observables desde fuera
//! - `error`: tipos de error
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use filestream::config::Config;
//! use filestream::server::StreamServer;
//!
//! let mut server = StreamServer::new(Config::for_file("/sdcard/jellies.mp4"));
//! let url = server.init("192.168.1.20").unwrap();
//! server.start().unwrap();
//! println!("Abrí {} en el reproductor", server.file_url().unwrap());
//! # let _ = url;
//! server.stop().unwrap();
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod server;
pub mod source;

pub use config::Config;
pub use error::{ConnectionError, ServerError};
pub use server::{ServerEvent, StreamServer};
