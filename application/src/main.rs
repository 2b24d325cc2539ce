use std::{
    future::IntoFuture as _,
    io,
    sync::OnceLock,
    time,
};

use application::{config, router, Args, Config};
use axum::extract::MatchedPath;
use axum_client_ip::InsecureClientIp;
use futures::FutureExt as _;
use service::{
    infra::{postgres, Postgres, Stripe},
    Service,
};
use tokio::net::TcpListener;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    cors::CorsLayer,
    trace::TraceLayer,
};
use tracing as log;
use tracing_subscriber::{
    filter::filter_fn,
    fmt::MakeWriter,
    layer::{Layer, SubscriberExt as _},
    registry::LookupSpan,
    util::SubscriberInitExt as _,
};

/// Levels written to `stderr` rather than `stdout`.
const STDERR_LEVELS: &[log::Level] = &[log::Level::WARN, log::Level::ERROR];

/// Configured log level, [`log::Level::INFO`] until the [`Config`] is
/// loaded.
static LOG_LEVEL: OnceLock<log::Level> = OnceLock::new();

postgres::embed_migrations!("../migrations");

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(log_layer(io::stdout, false))
        .with(log_layer(io::stderr, true))
        .init();

    _ = start().await;
}

/// Creates a log [`Layer`] writing into the provided `writer` either
/// [`STDERR_LEVELS`] only, or everything else.
fn log_layer<S, W>(writer: W, stderr: bool) -> impl Layer<S>
where
    S: tracing::Subscriber + for<'s> LookupSpan<'s> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .compact()
        .with_ansi(true)
        .with_thread_names(true)
        .with_writer(writer)
        .with_filter(filter_fn(move |meta| {
            meta.is_span()
                || STDERR_LEVELS.contains(meta.level()) == stderr
                    && LOG_LEVEL.get().copied().unwrap_or(log::Level::INFO)
                        >= *meta.level()
        }))
}

/// Loads the [`Config`], wires up the infrastructure and serves the API
/// until a shutdown signal, or a failure of the background tasks.
async fn start() -> Result<(), ()> {
    let Args { config } = Args::parse().map_err(|e| {
        log::error!("failed to parse command line arguments: {e}");
    })?;

    let Config {
        payments,
        postgres,
        service,
        server,
        log,
    } = Config::new(config).map_err(|e| {
        log::error!("failed to load `Config`: {e}");
    })?;

    LOG_LEVEL
        .set(log.level.into())
        .unwrap_or_else(|_| unreachable!("first initialization"));

    let mut postgres =
        Postgres::new(&postgres.into()).map_err(|e| {
            log::error!("failed to initialize `Postgres` client: {e}");
        })?;
    let report = migrations::runner()
        .run_async(&mut postgres)
        .await
        .map_err(|e| {
            log::error!("failed to run database migrations: {e}");
        })?;
    for m in report.applied_migrations() {
        log::info!("applied database migration `{m}`");
    }

    let stripe = Stripe::new(payments.into()).map_err(|e| {
        log::error!("failed to initialize `Stripe` client: {e}");
    })?;

    let (service, background) =
        Service::new(service.into(), postgres, stripe);

    let app = router(service)
        .layer(cors_layer(&server.cors)?)
        .layer(trace_layer());

    let listener = TcpListener::bind((server.host.clone(), server.port))
        .await
        .map_err(|e| {
            log::error!(
                "failed to listen on `{}:{}`: {e}",
                server.host,
                server.port,
            );
        })?;

    log::info!("listening on `{}:{}`", server.host, server.port);

    let serve = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    tokio::select! {
        res = serve => {
            res.map_err(|e| log::error!("webserver failed: {e}"))
        }
        res = background.into_future().fuse() => {
            res.map_err(|e| log::error!("background task failed: {e}"))
        }
    }
}

/// Creates a [`CorsLayer`] allowing the configured origins to call the
/// API.
fn cors_layer(cors: &config::Cors) -> Result<CorsLayer, ()> {
    let mut layer = CorsLayer::new()
        .allow_methods([
            http::Method::GET,
            http::Method::OPTIONS,
            http::Method::POST,
        ])
        .allow_headers([
            http::header::AUTHORIZATION,
            http::header::CONTENT_TYPE,
        ]);
    for origin in &cors.origins {
        layer = layer.allow_origin(
            origin.parse::<http::header::HeaderValue>().map_err(|e| {
                log::error!("`{origin}` is not correct CORS origin: {e}");
            })?,
        );
    }
    Ok(layer)
}

/// Creates a [`TraceLayer`] wrapping every HTTP request into a span and
/// logging its outcome.
fn trace_layer() -> TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    impl Fn(&http::Request<axum::body::Body>) -> tracing::Span + Clone,
    tower_http::trace::DefaultOnRequest,
    impl Fn(&http::Response<axum::body::Body>, time::Duration, &tracing::Span)
        + Clone,
> {
    TraceLayer::new_for_http()
        .make_span_with(|r: &http::Request<axum::body::Body>| {
            tracing::info_span!(
                "HTTP request",
                http.client_ip = InsecureClientIp::from(
                    r.headers(),
                    r.extensions()
                )
                    .map(|ip| ip.0.to_string())
                    .ok(),
                http.flavor = ?r.version(),
                http.host = r.uri().host(),
                http.method = r.method().as_str(),
                http.route = r
                    .extensions()
                    .get::<MatchedPath>()
                    .map(MatchedPath::as_str),
                http.target = r
                    .uri()
                    .path_and_query()
                    .map(http::uri::PathAndQuery::as_str),
                http.user_agent = r
                    .headers()
                    .get(http::header::USER_AGENT)
                    .and_then(|h| h.to_str().ok()),
                http.status_code = tracing::field::Empty,
            )
        })
        .on_response(
            |r: &http::Response<axum::body::Body>,
             dur: time::Duration,
             span: &tracing::Span| {
                _ = span.record(
                    "http.status_code",
                    tracing::field::display(r.status().as_u16()),
                );
                let duration = format!("{}ms", dur.as_millis());
                if r.status().is_server_error() {
                    log::error!(duration);
                } else if r.status().is_client_error() {
                    log::warn!(duration);
                } else {
                    log::info!(duration);
                }
            },
        )
}

/// Resolves once the process is asked to stop.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {e}");
        return;
    }
    log::info!("shutting down");
}

#[cfg(test)]
mod spec {
    use std::io;

    use tracing as log;
    use tracing_subscriber::layer::SubscriberExt as _;

    use super::log_layer;

    #[test]
    fn stacks_stdout_and_stderr_layers() {
        let subscriber = tracing_subscriber::registry()
            .with(log_layer(io::sink, false))
            .with(log_layer(io::sink, true));

        tracing::subscriber::with_default(subscriber, || {
            log::info!("written to stdout");
            log::error!("written to stderr");
        });
    }
}
