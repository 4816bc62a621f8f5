use std::io::Write;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::Parser;
use tokio::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::mpsc;

use sonic_bridge::config::{self, AppConfig};
use sonic_bridge::error::ApiResult;
use sonic_bridge::integration::{self, Integration};
use sonic_bridge::server::{self, appstate::AppState, http::HttpServer};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: Utf8PathBuf,

    /// Check the account credentials and exit
    #[arg(long)]
    check: bool,
}

/*
 * Formatter function to output in syslog format. This makes sense when running
 * as a service (where output might go to a log file, or the system journal)
 */
#[allow(clippy::match_same_arms)]
fn syslog_format(
    buf: &mut pretty_env_logger::env_logger::fmt::Formatter,
    record: &log::Record,
) -> std::io::Result<()> {
    writeln!(
        buf,
        "<{}>{}: {}",
        match record.level() {
            log::Level::Error => 3,
            log::Level::Warn => 4,
            log::Level::Info => 6,
            log::Level::Debug => 7,
            log::Level::Trace => 7,
        },
        record.target(),
        record.args()
    )
}

fn init_logging() -> ApiResult<()> {
    /* Try to provide reasonable default filters, when RUST_LOG is not specified */
    const DEFAULT_LOG_FILTERS: &[&str] = &[
        "debug",
        "reqwest=info",
        "hyper_util=info",
        "tower_http::trace::on_request=info",
        "axum::rejection=trace",
    ];

    let log_filters = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTERS.join(","));

    /* Detect if we need syslog or human-readable formatting */
    if std::env::var("SYSTEMD_EXEC_PID").is_ok_and(|pid| pid == std::process::id().to_string()) {
        Ok(pretty_env_logger::env_logger::builder()
            .format(syslog_format)
            .parse_filters(&log_filters)
            .try_init()?)
    } else {
        Ok(pretty_env_logger::formatted_timed_builder()
            .parse_filters(&log_filters)
            .try_init()?)
    }
}

fn install_signal_handlers() -> ApiResult<mpsc::Receiver<()>> {
    async fn shutdown(msg: &str, tx: mpsc::Sender<()>) {
        log::warn!("{msg}");
        let _ = std::io::stderr().flush();
        let _ = tx.send(()).await;
    }

    let (tx, rx) = mpsc::channel(1);

    let ctrlc = tx.clone();
    tokio::spawn(async move {
        if matches!(signal::ctrl_c().await, Ok(())) {
            shutdown("Ctrl-C pressed, exiting..", ctrlc).await;
        }
    });

    let mut signal = signal::unix::signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        if matches!(signal.recv().await, Some(())) {
            shutdown("SIGTERM received, exiting..", tx).await;
        }
    });

    Ok(rx)
}

/// Set up the integration, retrying for as long as the account reports not
/// ready.
async fn setup_with_retry(config: &AppConfig) -> ApiResult<Integration> {
    let delay = config.polling.setup_retry();
    loop {
        match integration::setup(config).await {
            Ok(integ) => return Ok(integ),
            Err(err) if err.is_not_ready() => {
                log::warn!("{err}. Retrying in {delay:?}");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

async fn check(config: &AppConfig) {
    match integration::validate_input(&config.account).await {
        Ok(title) => log::info!("Account check passed: {title}"),
        Err(err) => log::error!("Account check failed [{}]: {err}", err.code()),
    }
}

async fn run() -> ApiResult<()> {
    init_logging()?;

    let args = Args::parse();

    let config = config::parse(&args.config)?;
    log::debug!("Configuration loaded successfully");

    if args.check {
        check(&config).await;
        return Ok(());
    }

    let mut stop = install_signal_handlers()?;

    let integ = tokio::select! {
        res = setup_with_retry(&config) => Arc::new(res?),
        _ = stop.recv() => return Ok(()),
    };

    integ.start_polling(config.polling.interval());

    let bconf = &config.bridge;
    let http = HttpServer::http(bconf.ipaddress, bconf.http_port);
    let handle = http.handle();
    let router = server::build_router(AppState::new(integ.clone()));

    let server = http.run(router);
    tokio::pin!(server);

    tokio::select! {
        res = &mut server => res?,
        _ = stop.recv() => {
            HttpServer::signal_stop(&handle);
            server.await?;
        }
    }

    integ.unload().await;

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        log::error!("Sonic bridge error: {err}");
        log::error!("Fatal error encountered, cannot continue.");
    }
}
