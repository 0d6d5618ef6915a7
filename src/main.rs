//! An API server that turns uploaded 3D models into sliced print jobs.

#![deny(missing_docs)]

use anyhow::{bail, Result};
use clap::Parser;
use opentelemetry::{trace::TracerProvider, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use slice_api::{config::Config, report::SliceReport, workspace};
use slog::Drain;
use tracing_subscriber::prelude::*;

/// This doc string acts as a help message when the user runs '--help'
/// as do all doc strings on fields.
#[derive(Parser, Debug, Clone)]
#[clap(version = clap::crate_version!(), author = clap::crate_authors!("\n"))]
pub struct Opts {
    /// Print debug info
    #[clap(short, long)]
    pub debug: bool,

    /// Print logs as json
    #[clap(short, long)]
    pub json: bool,

    /// The subcommand to run.
    #[clap(subcommand)]
    pub subcmd: SubCommand,

    /// Path to config file.
    #[clap(short, long, default_value = "slice-api.toml")]
    pub config: std::path::PathBuf,
}

impl Opts {
    /// Setup our logger.
    pub fn create_logger(&self, app: &str) -> slog::Logger {
        if self.json {
            let drain = slog_json::Json::default(std::io::stderr()).fuse();
            self.async_root_logger(drain, app)
        } else {
            let decorator = slog_term::TermDecorator::new().build();
            let drain = slog_term::FullFormat::new(decorator).build().fuse();
            self.async_root_logger(drain, app)
        }
    }

    fn async_root_logger<T>(&self, drain: T, app: &str) -> slog::Logger
    where
        T: slog::Drain + Send + 'static,
        <T as slog::Drain>::Err: std::fmt::Debug,
    {
        let level = if self.debug {
            slog::Level::Debug
        } else {
            slog::Level::Info
        };

        let level_drain = slog::LevelFilter(drain, level).fuse();
        let async_drain = slog_async::Async::new(level_drain).build().fuse();
        slog::Logger::root(async_drain, slog::slog_o!("app" => app.to_owned()))
    }
}

/// A subcommand for our cli.
#[derive(Parser, Debug, Clone)]
pub enum SubCommand {
    /// Run the server.
    Server(Server),

    /// Slice the given `file` through the same pipeline the server uses,
    /// without HTTP, and print the report as JSON.
    SliceFile {
        /// Model file to slice.
        file: std::path::PathBuf,

        /// Material label.
        #[clap(long, default_value = "PLA")]
        material: String,

        /// Sparse infill fraction, 0.0..=1.0.
        #[clap(long, default_value_t = 0.2)]
        infill: f64,

        /// Layer height in millimeters.
        #[clap(long, default_value_t = 0.2)]
        layer_height: f64,

        /// Nozzle diameter in millimeters.
        #[clap(long, default_value_t = 0.4)]
        nozzle_diameter: f64,

        /// Units the model is expressed in.
        #[clap(long, default_value = "mm")]
        unit: workspace::Unit,
    },
}

/// A subcommand for running the server.
#[derive(Parser, Clone, Debug)]
pub struct Server {
    /// IP address and port that the server should listen
    #[clap(short, long, default_value = "0.0.0.0:8080")]
    pub address: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts: Opts = Opts::parse();

    // Format fields using the provided closure.
    // We want to make this very consise otherwise the logs are not able to be read by humans.
    let format = tracing_subscriber::fmt::format::debug_fn(|writer, field, value| {
        if format!("{}", field) == "message" {
            write!(writer, "{}: {:?}", field, value)
        } else {
            write!(writer, "{}", field)
        }
    })
    // Separate each field with a comma.
    // This method is provided by an extension trait in the
    // `tracing-subscriber` prelude.
    .delimited(", ");

    let (json, plain) = if opts.json {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer().pretty().fmt_fields(format)))
    };

    let otlp_host = match std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Ok(val) => val,
        Err(_) => "http://localhost:4317".to_string(),
    };

    // otel uses async runtime, so it must be started after the runtime
    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(opentelemetry_otlp::new_exporter().tonic().with_endpoint(otlp_host))
        .with_trace_config(
            opentelemetry_sdk::trace::Config::default()
                .with_resource(Resource::new(vec![KeyValue::new("service.name", "slice-api")])),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;
    opentelemetry::global::set_tracer_provider(provider.clone());
    let tracer = provider.tracer("tracing-otel-subscriber");

    let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);

    // Initialize tracing.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(json)
        .with(plain)
        .with(telemetry)
        .init();

    // A missing config file is not an error, the defaults stand alone.
    let config = if opts.config.exists() {
        Config::from_file(&opts.config)?
    } else {
        Config::default()
    };

    if let Err(err) = run_cmd(&opts, &config).await {
        bail!("running cmd `{:?}` failed: {:?}", &opts.subcmd, err);
    }

    Ok(())
}

async fn run_cmd(opts: &Opts, config: &Config) -> Result<()> {
    match &opts.subcmd {
        SubCommand::Server(s) => {
            slice_api::server::server(&s.address, config, opts.create_logger("server")).await?;
        }
        SubCommand::SliceFile {
            file,
            material,
            infill,
            layer_height,
            nozzle_diameter,
            unit,
        } => {
            let params = workspace::SliceParameters {
                material: material.clone(),
                infill: *infill,
                layer_height: *layer_height,
                nozzle_diameter: *nozzle_diameter,
                unit: *unit,
            };
            let model = tokio::fs::read(file).await?;
            let file_name = file
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("input.stl")
                .to_string();

            let mut ws =
                workspace::Workspace::build(&config.profiles_root, &params, &model, &file_name)
                    .await?;
            if config.keep_workspaces {
                ws.persist();
            }

            let outcome = config.slicer.load().slice(&ws).await?;
            let report = SliceReport::new(&ws, outcome, &file_name, &params);
            println!("{}", serde_json::to_string_pretty(&report)?);

            if !report.success {
                bail!("slicing failed, see the report above");
            }
        }
    }

    Ok(())
}
