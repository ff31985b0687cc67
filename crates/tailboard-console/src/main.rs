/*
[INPUT]:  CLI arguments, YAML configuration file, OS shutdown signals
[OUTPUT]: One running dashboard view (terminal UI or headless HTML output)
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, startup flow, or shutdown handling
*/

mod tui;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

use tailboard_adapter::{Offset, QueryClause, QueryOp, QueryRequest, TailClient};
use tailboard_console::{
    DashboardConfig, DrillDown, HtmlFileSurface, QuerySettings, QueryWatch, QueueSettings,
    QueueTarget, QueueWatch, RenderSurface, TailTarget, TailView, ViewHandle, ViewSettings,
    WatchSurface, spawn_view,
};

use crate::tui::{DIAGNOSTICS_CAPACITY, DiagnosticLines, DiagnosticsHandle, DiagnosticsWriterFactory};

#[derive(Parser, Debug)]
#[command(name = "tailboard", version, about = "Polling dashboard for log, task and queue endpoints")]
struct Cli {
    #[arg(long = "config", value_name = "PATH", global = true)]
    config_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info", global = true)]
    log_level: String,
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,
    /// Also write every frame to this HTML file
    #[arg(long = "html", value_name = "PATH", global = true)]
    html: Option<PathBuf>,
    /// Run without the terminal UI (requires --html)
    #[arg(long, global = true)]
    headless: bool,
    /// Override server.base_url
    #[arg(long = "base-url", value_name = "URL", global = true)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tail a topic through tail.cgi
    Tail {
        topic: String,
        #[arg(long, default_value = "last")]
        offset: Offset,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        count: Option<u32>,
        #[arg(long = "interval-ms", value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: Option<u64>,
        #[arg(long = "double-encode")]
        double_encode: bool,
    },
    /// Tail partitions of a topic through topic.cgi
    Topic {
        topic: String,
        #[arg(long, value_delimiter = ',', default_value = "0")]
        partitions: Vec<u32>,
        #[arg(long, default_value = "last")]
        offset: Offset,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        count: Option<u32>,
        #[arg(long = "interval-ms", value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: Option<u64>,
    },
    /// Tail the event log
    Events {
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        count: Option<u32>,
        #[arg(long = "interval-ms", value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: Option<u64>,
        #[arg(long = "hide-output")]
        hide_output: bool,
    },
    /// Tail the task log
    Tasks {
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        count: Option<u32>,
        #[arg(long = "interval-ms", value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: Option<u64>,
        #[arg(long = "hide-output")]
        hide_output: bool,
    },
    /// Poll an index query
    Query {
        #[arg(long, default_value = "tasks")]
        topic: String,
        /// Index name used to build `<topic>.<index>:index` when --field is absent
        #[arg(long, default_value = "ID")]
        index: String,
        #[arg(long)]
        field: Option<String>,
        /// keys, eq, ne, re, nr, ge or le (default: eq with a key, keys without)
        #[arg(long)]
        op: Option<QueryOp>,
        #[arg(long, default_value = "")]
        key: String,
        /// Extra clause FIELD,OP,KEY; repeat for a compound query
        #[arg(long = "clause", value_name = "FIELD,OP,KEY")]
        clauses: Vec<String>,
    },
    /// Watch a queue, or list all queues when no name is given
    Queue { name: Option<String> },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let mut config = DashboardConfig::load(args.config_path.as_deref()).context("load config")?;
    if let Some(base_url) = &args.base_url {
        config.server.base_url = base_url.clone();
    }

    if matches!(args.command, Command::Config) {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    if args.headless && args.html.is_none() {
        bail!("--headless requires --html PATH");
    }

    let diagnostics = DiagnosticLines::handle(DIAGNOSTICS_CAPACITY);
    let _log_guard = init_tracing(
        &args.log_level,
        args.log_file.as_deref(),
        (!args.headless).then(|| diagnostics.clone()),
    )?;

    info!(
        base_url = %config.server.base_url,
        headless = args.headless,
        "starting tailboard"
    );

    let client = Arc::new(
        TailClient::with_config(config.client_config(), &config.server.base_url)
            .map_err(|err| anyhow!(err))
            .context("create client")?,
    );

    let (watch_surface, frames) = WatchSurface::channel();
    let mut surfaces: Vec<Box<dyn RenderSurface>> = vec![Box::new(watch_surface)];
    if let Some(path) = &args.html {
        surfaces.push(Box::new(HtmlFileSurface::new(path)));
    }

    let shutdown = CancellationToken::new();
    setup_signal_handlers(shutdown.clone());

    let drill_down = DrillDown::new(Arc::clone(&client), query_settings(&config), queue_settings(&config));
    let handle = start_view(args.command, &config, client, surfaces, frames, shutdown.clone())?;

    if args.headless {
        shutdown.cancelled().await;
        info!("shutdown signal received");
    } else {
        let result = tui::run_tui(&handle, &drill_down, diagnostics, shutdown.clone()).await;
        if let Err(err) = &result {
            warn!(error = %err, "terminal UI failed");
        }
        result?;
    }

    handle.shutdown().await.context("stop view")?;
    info!("view stopped");
    Ok(())
}

fn start_view(
    command: Command,
    config: &DashboardConfig,
    client: Arc<TailClient>,
    surfaces: Vec<Box<dyn RenderSurface>>,
    frames: tailboard_console::FrameReceiver,
    shutdown: CancellationToken,
) -> Result<ViewHandle> {
    let tail_settings = |target: &TailTarget, count: Option<u32>, interval_ms: Option<u64>| {
        ViewSettings {
            count: count.unwrap_or_else(|| target.default_count()),
            render_interval: interval_ms
                .map(std::time::Duration::from_millis)
                .unwrap_or_else(|| config.render_interval()),
            poller: config.poller_config(),
            zone: config.render.time_zone,
        }
    };

    let handle = match command {
        Command::Tail {
            topic,
            offset,
            count,
            interval_ms,
            double_encode,
        } => {
            let target = TailTarget::Tail {
                topic,
                offset,
                double_encode,
            };
            let settings = tail_settings(&target, count, interval_ms);
            let view = TailView::connect(target, settings, client, surfaces);
            spawn_view(view, frames, shutdown)
        }
        Command::Topic {
            topic,
            partitions,
            offset,
            count,
            interval_ms,
        } => {
            if partitions.is_empty() {
                bail!("at least one partition is required");
            }
            let target = TailTarget::Topic {
                topic,
                partitions,
                offset,
            };
            let settings = tail_settings(&target, count, interval_ms);
            let view = TailView::connect(target, settings, client, surfaces);
            spawn_view(view, frames, shutdown)
        }
        Command::Events {
            count,
            interval_ms,
            hide_output,
        } => {
            let target = TailTarget::Events;
            let settings = tail_settings(&target, count, interval_ms);
            let view = TailView::connect(target, settings, client, surfaces).with_output(!hide_output);
            spawn_view(view, frames, shutdown)
        }
        Command::Tasks {
            count,
            interval_ms,
            hide_output,
        } => {
            let target = TailTarget::Tasks;
            let settings = tail_settings(&target, count, interval_ms);
            let view = TailView::connect(target, settings, client, surfaces).with_output(!hide_output);
            spawn_view(view, frames, shutdown)
        }
        Command::Query {
            topic,
            index,
            field,
            op,
            key,
            clauses,
        } => {
            let request = build_query(&topic, &index, field, op, &key, &clauses)?;
            let watch = QueryWatch::new(client, topic, request, query_settings(config), surfaces);
            spawn_view(watch, frames, shutdown)
        }
        Command::Queue { name } => {
            let target = match name {
                Some(name) => QueueTarget::Messages(name),
                None => QueueTarget::List,
            };
            let watch = QueueWatch::new(client, target, queue_settings(config), surfaces);
            spawn_view(watch, frames, shutdown)
        }
        Command::Config => bail!("config does not start a view"),
    };
    Ok(handle)
}

fn query_settings(config: &DashboardConfig) -> QuerySettings {
    QuerySettings {
        idle_delay: config.idle_delay(),
        zone: config.render.time_zone,
        ..QuerySettings::default()
    }
}

fn queue_settings(config: &DashboardConfig) -> QueueSettings {
    QueueSettings {
        interval: config.queue_interval(),
        zone: config.render.time_zone,
        ..QueueSettings::default()
    }
}

fn build_query(
    topic: &str,
    index: &str,
    field: Option<String>,
    op: Option<QueryOp>,
    key: &str,
    extra: &[String],
) -> Result<QueryRequest> {
    let field = field.unwrap_or_else(|| QueryClause::index_field(topic, index));
    let first = match op {
        Some(op) => QueryClause::new(field, op, key),
        None => QueryClause::lookup(field, key),
    };

    let mut clauses = vec![first];
    for raw in extra {
        let mut parts = raw.splitn(3, ',');
        let (Some(field), Some(op), Some(key)) = (parts.next(), parts.next(), parts.next()) else {
            bail!("clause must be FIELD,OP,KEY: {raw}");
        };
        let op: QueryOp = op.parse().map_err(|err: String| anyhow!(err))?;
        clauses.push(QueryClause::new(field, op, key));
    }

    QueryRequest::from_clauses(clauses).context("empty query")
}

fn init_tracing(
    log_level: &str,
    log_file: Option<&Path>,
    diagnostics: Option<DiagnosticsHandle>,
) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;

    let mut guard = None;
    let file_writer = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path.file_name().context("log file path has no file name")?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, worker_guard) = tracing_appender::non_blocking(appender);
            guard = Some(worker_guard);
            Some(writer)
        }
        None => None,
    };

    let writer = match (diagnostics, file_writer) {
        (Some(lines), Some(file)) => {
            BoxMakeWriter::new(DiagnosticsWriterFactory::new(lines).and(file))
        }
        (Some(lines), None) => BoxMakeWriter::new(DiagnosticsWriterFactory::new(lines)),
        (None, Some(file)) => BoxMakeWriter::new(std::io::stderr.and(file)),
        (None, None) => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(guard)
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown_clone.cancel();
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("received SIGTERM");
                    shutdown_clone.cancel();
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_defaults_to_index_lookup() {
        let request = build_query("tasks", "ID", None, None, "task-1", &[]).expect("query");
        assert_eq!(
            request,
            QueryRequest::Single(QueryClause::new("tasks.ID:index", QueryOp::Eq, "task-1"))
        );

        let keys = build_query("event_log", "ID", None, None, "", &[]).expect("query");
        assert_eq!(keys.op(), QueryOp::Keys);
    }

    #[test]
    fn extra_clauses_build_compound_queries() {
        let request = build_query(
            "tasks",
            "ID",
            None,
            Some(QueryOp::Ge),
            "a",
            &["tasks.type:index,eq,TASK_ERROR".to_string()],
        )
        .expect("query");
        let QueryRequest::Compound(clauses) = request else {
            panic!("expected compound query");
        };
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[1].key, "TASK_ERROR");

        assert!(build_query("t", "ID", None, None, "", &["bad".to_string()]).is_err());
    }

    #[test]
    fn cli_parses_view_subcommands() {
        let cli = Cli::try_parse_from([
            "tailboard",
            "topic",
            "logs",
            "--partitions",
            "0,2",
            "--offset",
            "recent",
        ])
        .expect("parse");
        match cli.command {
            Command::Topic {
                partitions, offset, ..
            } => {
                assert_eq!(partitions, vec![0, 2]);
                assert_eq!(offset, Offset::Recent);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn zero_count_and_interval_are_rejected() {
        assert!(Cli::try_parse_from(["tailboard", "tasks", "--count", "0"]).is_err());
        assert!(Cli::try_parse_from(["tailboard", "tail", "logs", "--interval-ms", "0"]).is_err());
        let cli = Cli::try_parse_from(["tailboard", "events", "--count", "1"]).expect("parse");
        assert!(matches!(cli.command, Command::Events { count: Some(1), .. }));
    }
}
