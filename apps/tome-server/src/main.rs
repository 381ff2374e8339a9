use tracing::error;

#[tokio::main]
async fn main() {
    tome_server::telemetry::init();

    let opts = match tome_server::ServeOptions::from_env() {
        Ok(opts) => opts,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = tome_server::serve(opts).await {
        error!("http server exited with error: {err:#}");
        std::process::exit(1);
    }
}
