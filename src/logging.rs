// Centralized tracing setup: runtime log levels from env, optional JSON file output, span timing
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::{debug, field::Field, field::Visit, span, Id, Subscriber};
use tracing_subscriber::{
    fmt,
    layer::{Context, Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

const CRATE_TARGET: &str = "capm_dashboard";

pub fn init_logging(app_name: &str) -> eyre::Result<()> {
    let console_log_level = env::var("CONSOLE_LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string());
    let file_log_level = env::var("FILE_LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string());
    let log_to_file = env::var("LOG_TO_FILE").map(|v| v == "true").unwrap_or(false);

    let console_layer = fmt::Layer::new()
        .pretty()
        .with_filter(crate_filter(app_name, &console_log_level));

    if log_to_file {
        let log_dir = PathBuf::from(env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()));
        fs::create_dir_all(&log_dir)?;
        let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
        let file_appender = tracing_appender::rolling::never(&log_dir, format!("{app_name}_{timestamp}.log"));
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        FILE_GUARD.set(guard).ok();

        let file_layer = fmt::Layer::new()
            .json()
            .with_writer(non_blocking)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_filter(crate_filter(app_name, &file_log_level));

        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .with(SpanTimingLayer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(console_layer)
            .with(SpanTimingLayer)
            .try_init()?;
    }

    Ok(())
}

// Library and calling binary at `level`, dependencies at warn
fn crate_filter(app_name: &str, level: &str) -> EnvFilter {
    EnvFilter::try_new(format!("warn,{CRATE_TARGET}={level},{app_name}={level}"))
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,{CRATE_TARGET}=info,{app_name}=info")))
}

/// Logs busy/idle/total time when a span declared with `on_close = true` closes.
pub struct SpanTimingLayer;

struct SpanTiming {
    started: Instant,
    last_transition: Instant,
    busy: Duration,
    idle: Duration,
}

struct OnCloseVisitor {
    on_close: bool,
}

impl Visit for OnCloseVisitor {
    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "on_close" {
            self.on_close = value;
        }
    }

    fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
}

impl<S> Layer<S> for SpanTimingLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = OnCloseVisitor { on_close: false };
        attrs.record(&mut visitor);
        if !visitor.on_close {
            return;
        }
        if let Some(span) = ctx.span(id) {
            let now = Instant::now();
            span.extensions_mut().insert(SpanTiming {
                started: now,
                last_transition: now,
                busy: Duration::ZERO,
                idle: Duration::ZERO,
            });
        }
    }

    // Time between exit and the next enter counts as idle
    fn on_enter(&self, id: &Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            if let Some(timing) = span.extensions_mut().get_mut::<SpanTiming>() {
                timing.idle += timing.last_transition.elapsed();
                timing.last_transition = Instant::now();
            }
        }
    }

    fn on_exit(&self, id: &Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            if let Some(timing) = span.extensions_mut().get_mut::<SpanTiming>() {
                timing.busy += timing.last_transition.elapsed();
                timing.last_transition = Instant::now();
            }
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(&id) {
            if let Some(timing) = span.extensions_mut().remove::<SpanTiming>() {
                debug!(
                    span = span.name(),
                    busy_time = ?timing.busy,
                    idle_time = ?timing.idle,
                    total_time = ?timing.started.elapsed(),
                    "span closed"
                );
            }
        }
    }
}
