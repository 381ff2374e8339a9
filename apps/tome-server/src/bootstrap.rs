use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

use crate::{router, AppState};
use tome_kernel::Kernel;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid TOME_PORT: {0}")]
    InvalidPort(String),
    #[error("invalid TOME_BIND: {0}")]
    InvalidBind(String),
    #[error("invalid TOME_HTTP_MAX_CONC: {0}")]
    InvalidConcurrency(String),
    #[error("TOME_BIND={0} is not a loopback address; this service is localhost-only")]
    PublicBind(String),
}

#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub addr: SocketAddr,
    pub state_dir: PathBuf,
    pub concurrency_limit: usize,
}

impl ServeOptions {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind = std::env::var("TOME_BIND").unwrap_or_else(|_| "127.0.0.1".into());
        let port = std::env::var("TOME_PORT").unwrap_or_else(|_| "8137".into());
        let max_conc = std::env::var("TOME_HTTP_MAX_CONC").ok();
        Self::from_values(&bind, &port, max_conc.as_deref(), state_dir_from_env())
    }

    fn from_values(
        bind: &str,
        port: &str,
        max_conc: Option<&str>,
        state_dir: PathBuf,
    ) -> Result<Self, ConfigError> {
        let ip: IpAddr = bind
            .parse()
            .map_err(|_| ConfigError::InvalidBind(bind.to_string()))?;
        if !ip.is_loopback() {
            return Err(ConfigError::PublicBind(bind.to_string()));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| ConfigError::InvalidPort(port.to_string()))?;
        let concurrency_limit = max_conc
            .map(|raw| {
                raw.parse()
                    .map_err(|_| ConfigError::InvalidConcurrency(raw.to_string()))
            })
            .transpose()?
            .unwrap_or(1024);
        Ok(Self {
            addr: SocketAddr::new(ip, port),
            state_dir,
            concurrency_limit,
        })
    }
}

/// State directory: `TOME_STATE_DIR` when set, otherwise the directory the
/// running executable lives in (the database sits beside the binary).
pub(crate) fn state_dir_from_env() -> PathBuf {
    if let Some(dir) = std::env::var_os("TOME_STATE_DIR") {
        return PathBuf::from(dir);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub(crate) fn open_kernel(state_dir: &Path) -> anyhow::Result<Kernel> {
    let db_existed = state_dir.join(tome_kernel::DB_FILE).exists();
    let kernel = Kernel::open(state_dir).context("open embedded database")?;
    if db_existed {
        info!(path = %kernel.db_path().display(), "using existing database");
    } else {
        info!(path = %kernel.db_path().display(), "created new database");
    }
    Ok(kernel)
}

fn attach_layers(router: axum::Router, concurrency_limit: usize) -> axum::Router {
    use tower::limit::ConcurrencyLimitLayer;
    use tower_http::{cors::CorsLayer, trace::TraceLayer};

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(concurrency_limit))
}

/// Open the store, build the router and serve until shutdown. The kernel is
/// opened (and the schema created) before the listener binds, so no request
/// can observe a half-initialized store.
pub async fn serve(opts: ServeOptions) -> anyhow::Result<()> {
    let kernel = open_kernel(&opts.state_dir)?;
    let state = AppState::new(kernel);
    let app = attach_layers(
        router::build_router().with_state(state),
        opts.concurrency_limit,
    );

    let listener = tokio::net::TcpListener::bind(opts.addr)
        .await
        .with_context(|| format!("bind {}", opts.addr))?;
    info!(addr = %opts.addr, "tome service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_to_loopback() {
        let opts =
            ServeOptions::from_values("127.0.0.1", "8137", None, PathBuf::from("/tmp/state"))
                .expect("options");
        assert_eq!(opts.addr.to_string(), "127.0.0.1:8137");
        assert_eq!(opts.concurrency_limit, 1024);
    }

    #[test]
    fn public_bind_is_refused() {
        let err = ServeOptions::from_values("0.0.0.0", "8137", None, PathBuf::from("."))
            .expect_err("must refuse");
        assert!(matches!(err, ConfigError::PublicBind(_)));
    }

    #[test]
    fn malformed_values_are_typed_errors() {
        assert!(matches!(
            ServeOptions::from_values("127.0.0.1", "notaport", None, PathBuf::from(".")),
            Err(ConfigError::InvalidPort(_))
        ));
        assert!(matches!(
            ServeOptions::from_values("localhost", "8137", None, PathBuf::from(".")),
            Err(ConfigError::InvalidBind(_))
        ));
        assert!(matches!(
            ServeOptions::from_values("127.0.0.1", "8137", Some("zero"), PathBuf::from(".")),
            Err(ConfigError::InvalidConcurrency(_))
        ));
    }
}
