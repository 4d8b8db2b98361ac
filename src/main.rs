//! # filestream - Entry Point
//! src/main.rs
//!
//! Levanta el servidor con la configuración de CLI/entorno y lo mantiene
//! corriendo hasta recibir SIGINT/SIGTERM (o Enter en plataformas sin
//! señales POSIX).

use filestream::config::Config;
use filestream::server::{ServerEvent, StreamServer};
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    let config = Config::new();
    if let Err(e) = config.validate() {
        eprintln!("❌ Configuración inválida: {}", e);
        std::process::exit(1);
    }
    config.print_summary();

    let host = config.host.clone();
    let mut server = StreamServer::new(config);

    server.subscribe(|event| {
        if let ServerEvent::AcceptFailed { error } = event {
            eprintln!("⚠️  accept falló: {}", error);
        }
    });

    if let Err(e) = server.init(&host) {
        eprintln!("💥 Error fatal: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = server.start() {
        eprintln!("💥 Error fatal: {}", e);
        std::process::exit(1);
    }

    if let Some(url) = server.file_url() {
        println!("▶️  Streaming en {}", url);
    }
    println!("   Ctrl+C para detener");
    println!();

    wait_for_shutdown();

    if let Err(e) = server.stop() {
        eprintln!("💥 Error deteniendo el servidor: {}", e);
        std::process::exit(1);
    }

    println!("📊 Métricas finales:");
    println!("{}", server.metrics().to_json());
}

/// Logging estructurado; `RUST_LOG` tiene prioridad
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("filestream=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .init();
}

#[cfg(unix)]
fn wait_for_shutdown() {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = match Signals::new([SIGINT, SIGTERM]) {
        Ok(signals) => signals,
        Err(e) => {
            tracing::warn!(error = %e, "no se pudieron registrar señales; esperando Enter");
            wait_for_enter();
            return;
        }
    };

    if let Some(signal) = signals.forever().next() {
        tracing::info!(signal, "señal recibida");
    }
}

#[cfg(not(unix))]
fn wait_for_shutdown() {
    println!("   (Enter para detener)");
    wait_for_enter();
}

fn wait_for_enter() {
    let mut line = String::new();
    if let Err(e) = std::io::stdin().read_line(&mut line) {
        tracing::warn!(error = %e, "no se pudo leer stdin");
    }
}
