/*

Callguard Example

Serves a couple of instrumented handlers over HTTP so both failure
conventions can be observed with curl.

Usage:
    APP_ENVIRONMENT=dev cargo run -p callguard-examples -- \
        --port 8080 \
        [--reporter payload] \
        [--use-config-files]

Without APP_ENVIRONMENT=dev, process logs go to rotated files under logs/.

Then:
    curl localhost:8080/divide/8/2    -> 4
    curl localhost:8080/divide/8/0    -> 500 {"detail":"division by zero"}
                                         or {"status_code":500,"message":"division by zero"}
    curl localhost:8080/slow/250      -> bytes cached in the scratch pool, released afterwards
    curl localhost:8080/slow/9000     -> 400, the handler's own error passes through

Every call logs one line with its duration, failures log the error and a
backtrace, and the scratch pool is emptied after each call when
`reclaim_memory` is enabled.

*/

use actix_web::web::Data;
use actix_web::{App, HttpServer};
use callguard::{FnReclaimer, HttpReporter, Instrumentation, MemoryReclaimer, PayloadReporter};
use callguard_config::load_config;
use callguard_config::shared::{GuardConfig, ReporterKind};
use callguard_telemetry::tracing::init_tracing;
use clap::{Parser, ValueEnum};
use tracing::info;

use crate::routes::{DivideFn, SlowFn};
use crate::scratch::ScratchPool;

mod routes;
mod scratch;

#[derive(Debug, Parser)]
#[command(name = "callguard-examples", version, about)]
struct AppArgs {
    /// Address the HTTP server binds to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Port the HTTP server listens on
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Load `configuration/*.yaml` instead of the built-in defaults
    #[arg(long)]
    use_config_files: bool,
    /// How `/divide` reports unclassified failures, overriding the configuration
    #[arg(long, value_enum)]
    reporter: Option<ReporterArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReporterArg {
    Http,
    Payload,
}

impl From<ReporterArg> for ReporterKind {
    fn from(value: ReporterArg) -> Self {
        match value {
            ReporterArg::Http => ReporterKind::Http,
            ReporterArg::Payload => ReporterKind::Payload,
        }
    }
}

/// Empties the scratch pool, standing in for an accelerator cache release.
fn pool_reclaimer(pool: &Data<ScratchPool>) -> impl MemoryReclaimer + 'static {
    let pool = pool.clone();
    FnReclaimer::new(move || {
        let released = pool.release_all();
        tracing::debug!(released, cached = pool.cached_bytes(), "scratch pool emptied");
    })
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = AppArgs::parse();

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME"))?;

    let mut config = if args.use_config_files {
        load_config::<GuardConfig>()?
    } else {
        GuardConfig::default()
    };
    if let Some(reporter) = args.reporter {
        config.reporter = reporter.into();
    }
    config.validate()?;

    let pool = Data::new(ScratchPool::default());
    let http = Instrumentation::from_config(&config, HttpReporter, pool_reclaimer(&pool));
    let payload = Instrumentation::from_config(&config, PayloadReporter, pool_reclaimer(&pool));

    let divide_http = Data::new(http.wrap("divide", routes::divide as DivideFn));
    let divide_payload = Data::new(payload.wrap("divide", routes::divide as DivideFn));
    let slow = Data::new(http.wrap_async("slow", routes::slow as SlowFn));
    let reporter = config.reporter;

    info!(
        host = %args.host,
        port = args.port,
        reporter = ?reporter,
        reclaim_memory = config.reclaim_memory,
        "starting callguard example server"
    );

    HttpServer::new(move || {
        let app = App::new()
            .app_data(pool.clone())
            .app_data(slow.clone())
            .service(routes::slow_route);

        match reporter {
            ReporterKind::Http => app
                .app_data(divide_http.clone())
                .service(routes::divide_http),
            ReporterKind::Payload => app
                .app_data(divide_payload.clone())
                .service(routes::divide_payload),
        }
    })
    .bind((args.host.as_str(), args.port))?
    .run()
    .await?;

    Ok(())
}
