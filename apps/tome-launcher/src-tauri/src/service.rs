use std::net::SocketAddr;
use std::time::{Duration, Instant};

use anyhow::Result;
use once_cell::sync::OnceCell;
use tauri::{AppHandle, Manager};
use tracing::{error, info};

use tome_server::ServeOptions;

/// Upper bound on the startup wait before the launch is abandoned.
const READY_TIMEOUT: Duration = Duration::from_secs(15);

fn http_client() -> &'static reqwest::Client {
    static HTTP: OnceCell<reqwest::Client> = OnceCell::new();
    HTTP.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(Duration::from_millis(1200))
            .build()
            .unwrap()
    })
}

/// Spawn the embedded service, wait for it to report healthy, then open the
/// main window. Runs once from the Tauri setup hook.
pub async fn start_and_open(app: AppHandle) {
    let opts = match ServeOptions::from_env() {
        Ok(opts) => opts,
        Err(err) => {
            error!("invalid service configuration: {err}");
            app.exit(2);
            return;
        }
    };
    let addr = opts.addr;
    tauri::async_runtime::spawn(async move {
        if let Err(err) = tome_server::serve(opts).await {
            error!("embedded service exited: {err:#}");
        }
    });

    match wait_for_ready(addr).await {
        Ok(elapsed) => {
            info!(elapsed_ms = elapsed.as_millis() as u64, "service is ready");
            if let Err(err) = open_main_window(&app, addr) {
                error!("failed to open main window: {err}");
                app.exit(1);
            }
        }
        Err(err) => {
            error!("startup aborted: {err}");
            app.exit(1);
        }
    }
}

// First checks come fast, later ones settle at one per second.
fn poll_delay(checks: u32) -> Duration {
    let ms = match checks {
        0..=2 => 200,
        3..=5 => 500,
        _ => 1000,
    };
    Duration::from_millis(ms)
}

async fn wait_for_ready(addr: SocketAddr) -> Result<Duration> {
    let url = format!("http://{addr}/api/health");
    let start = Instant::now();
    let mut checks = 0u32;
    while start.elapsed() < READY_TIMEOUT {
        if let Ok(resp) = http_client().get(&url).send().await {
            if resp.status().is_success() {
                return Ok(start.elapsed());
            }
        }
        tokio::time::sleep(poll_delay(checks)).await;
        checks += 1;
    }
    anyhow::bail!("service did not become healthy within {READY_TIMEOUT:?}")
}

/// One non-blocking health check, used by the tray status loop.
pub async fn check_health_once() -> bool {
    let Ok(opts) = ServeOptions::from_env() else {
        return false;
    };
    let url = format!("http://{}/api/health", opts.addr);
    match http_client().get(&url).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}

pub fn open_main_window(app: &AppHandle, addr: SocketAddr) -> tauri::Result<()> {
    if let Some(w) = app.get_webview_window("main") {
        let _ = w.show();
        let _ = w.set_focus();
        return Ok(());
    }
    let url: tauri::Url = format!("http://{addr}/").parse().unwrap();
    tauri::WebviewWindowBuilder::new(app, "main", tauri::WebviewUrl::External(url))
        .title("Tome")
        .inner_size(1200.0, 800.0)
        .min_inner_size(1024.0, 768.0)
        .maximized(true)
        .build()?;
    Ok(())
}

pub fn show_main_window(app: &AppHandle) {
    if let Some(w) = app.get_webview_window("main") {
        let _ = w.show();
        let _ = w.unminimize();
        let _ = w.set_focus();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_schedule_grows_then_plateaus() {
        assert_eq!(poll_delay(0), Duration::from_millis(200));
        assert_eq!(poll_delay(2), Duration::from_millis(200));
        assert_eq!(poll_delay(3), Duration::from_millis(500));
        assert_eq!(poll_delay(5), Duration::from_millis(500));
        assert_eq!(poll_delay(6), Duration::from_millis(1000));
        assert_eq!(poll_delay(60), Duration::from_millis(1000));
    }
}
