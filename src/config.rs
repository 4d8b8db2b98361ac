//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración por argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./filestream --file /sdcard/jellies.mp4 \
//!   --host 192.168.1.20 \
//!   --port 0 \
//!   --content-type video/mp4
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! STREAM_FILE=./movie.mp4 STREAM_HOST=0.0.0.0 STREAM_PORT=8080 ./filestream
//! ```

use crate::server::connection::LoopMode;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Content type por defecto
pub const DEFAULT_CONTENT_TYPE: &str = "video/mp4";

/// Tamaño de chunk por defecto (50 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 50 * 1024;

/// Buffer de headers por defecto (8 KiB)
pub const DEFAULT_HEADER_BUFFER: usize = 8192;

/// Configuración del servidor de streaming
#[derive(Debug, Clone, Parser)]
#[command(name = "filestream")]
#[command(about = "Streams a single local file over HTTP with byte-range seeking")]
#[command(version)]
pub struct Config {
    /// Archivo a transmitir
    #[arg(short, long, env = "STREAM_FILE")]
    pub file: PathBuf,

    /// IP o hostname donde escuchar (la IP del dispositivo en la LAN)
    #[arg(long, default_value = "127.0.0.1", env = "STREAM_HOST")]
    pub host: String,

    /// Puerto; 0 deja que el sistema operativo elija uno
    #[arg(short, long, default_value = "0", env = "STREAM_PORT")]
    pub port: u16,

    /// MIME type anunciado en Content-Type
    #[arg(long = "content-type", default_value = DEFAULT_CONTENT_TYPE, env = "STREAM_CONTENT_TYPE")]
    pub content_type: String,

    // === Streaming ===

    /// Bytes leídos y enviados por iteración
    #[arg(long = "chunk-size", default_value = "51200", env = "STREAM_CHUNK_SIZE")]
    pub chunk_size: usize,

    /// Máximo de bytes para el bloque de headers del request
    #[arg(long = "header-buffer", default_value = "8192", env = "STREAM_HEADER_BUFFER")]
    pub header_buffer_size: usize,

    /// Pausa cuando una pasada no envía nada, en milisegundos
    #[arg(long = "idle-pause-ms", default_value = "1000", env = "STREAM_IDLE_PAUSE_MS")]
    pub idle_pause_ms: u64,

    /// Terminar la respuesta en EOF en vez de reabrir el archivo
    #[arg(long = "no-loop", env = "STREAM_NO_LOOP")]
    pub no_loop: bool,

    // === Accept ===

    /// Espera máxima de cada accept, en milisegundos
    #[arg(long = "accept-timeout-ms", default_value = "10000", env = "STREAM_ACCEPT_TIMEOUT_MS")]
    pub accept_timeout_ms: u64,
}

impl Config {
    /// Crea la configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Configuración por defecto para un archivo
    ///
    /// # Ejemplo
    /// ```rust
    /// use filestream::config::Config;
    ///
    /// let config = Config::for_file("/sdcard/jellies.mp4");
    /// assert_eq!(config.address(), "127.0.0.1:0");
    /// assert_eq!(config.content_type, "video/mp4");
    /// ```
    pub fn for_file(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            host: "127.0.0.1".to_string(),
            port: 0,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            header_buffer_size: DEFAULT_HEADER_BUFFER,
            idle_pause_ms: 1000,
            no_loop: false,
            accept_timeout_ms: 10_000,
        }
    }

    /// Dirección completa para bind (host:port)
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Timeout de accept como `Duration`
    pub fn accept_timeout(&self) -> Duration {
        Duration::from_millis(self.accept_timeout_ms)
    }

    /// Pausa sin datos como `Duration`
    pub fn idle_pause(&self) -> Duration {
        Duration::from_millis(self.idle_pause_ms)
    }

    /// Qué hacer al llegar a EOF
    pub fn loop_mode(&self) -> LoopMode {
        if self.no_loop {
            LoopMode::Once
        } else {
            LoopMode::Restart
        }
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), String> {
        if self.file.as_os_str().is_empty() {
            return Err("File path must not be empty".to_string());
        }
        if self.content_type.trim().is_empty() {
            return Err("Content type must not be empty".to_string());
        }
        if self.chunk_size == 0 {
            return Err("Chunk size must be >= 1".to_string());
        }
        // Debe caber al menos "GET / \r\n\r\n"
        if self.header_buffer_size < 16 {
            return Err("Header buffer must be >= 16 bytes".to_string());
        }
        if self.accept_timeout_ms == 0 {
            return Err("Accept timeout must be > 0".to_string());
        }
        if self.idle_pause_ms == 0 {
            return Err("Idle pause must be > 0".to_string());
        }
        Ok(())
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("╔══════════════════════════════════════════════════════════════╗");
        println!("║               filestream configuration                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝");
        println!();
        println!("🎞  Content:");
        println!("   File:          {}", self.file.display());
        println!("   Content-Type:  {}", self.content_type);
        println!("   On EOF:        {}", match self.loop_mode() {
            LoopMode::Restart => "reopen (simulated live stream)",
            LoopMode::Once => "close connection",
        });
        println!();
        println!("🌐 Network:");
        println!("   Bind:          {}", self.address());
        println!("   Accept wait:   {} ms", self.accept_timeout_ms);
        println!();
        println!("📦 Streaming:");
        println!("   Chunk size:    {} bytes", self.chunk_size);
        println!("   Header buffer: {} bytes", self.header_buffer_size);
        println!("   Idle pause:    {} ms", self.idle_pause_ms);
        println!();
        println!("═══════════════════════════════════════════════════════════════");
        println!();
    }
}
