#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod service;

use tauri::Manager;

#[cfg(all(desktop, not(test)))]
fn create_tray(app: &tauri::AppHandle) -> tauri::Result<()> {
    use std::time::Duration;
    use tauri::menu::{Menu, MenuItem};
    use tauri::tray::TrayIconBuilder;

    let show_i = MenuItem::with_id(app, "show", "Show Window", true, None::<&str>)?;
    let quit_i = MenuItem::with_id(app, "quit", "Quit", true, None::<&str>)?;
    let menu = Menu::with_items(app, &[&show_i, &quit_i])?;

    let _ = TrayIconBuilder::with_id("tome-tray")
        .tooltip("Tome")
        .menu(&menu)
        .on_menu_event(|app, event| match event.id.as_ref() {
            "show" => service::show_main_window(app),
            // Deliberately abrupt: the embedded service task is not drained.
            "quit" => app.exit(0),
            _ => {}
        })
        .build(app);

    // Background health polling keeps the tray tooltip honest.
    let app_h = app.clone();
    tauri::async_runtime::spawn(async move {
        let mut prev = None;
        let mut delay = Duration::from_secs(2);
        loop {
            let is_up = service::check_health_once().await;
            if let Some(tray) = app_h.tray_by_id("tome-tray") {
                let _ = tray.set_tooltip(Some(if is_up {
                    "Tome: online"
                } else {
                    "Tome: offline"
                }));
            }
            if prev != Some(is_up) {
                prev = Some(is_up);
                delay = Duration::from_secs(2);
            } else {
                // modest backoff while state is stable
                let next = delay.as_secs().saturating_mul(2).min(16);
                delay = Duration::from_secs(next);
            }
            tokio::time::sleep(delay).await;
        }
    });

    Ok(())
}

fn main() {
    tome_server::telemetry::init();

    tauri::Builder::<tauri::Wry>::default()
        .plugin(tauri_plugin_single_instance::init(|app, _argv, _cwd| {
            // Focus the existing window on second-instance attempt
            service::show_main_window(app);
        }))
        .setup(|app| {
            #[cfg(all(desktop, not(test)))]
            {
                create_tray(app.handle())?;
            }

            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                service::start_and_open(handle).await;
            });
            Ok(())
        })
        .on_window_event(|window, event| {
            // Closing the window hides it; tray Quit is the only exit path.
            if let tauri::WindowEvent::CloseRequested { api, .. } = event {
                api.prevent_close();
                let _ = window.hide();
            }
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
