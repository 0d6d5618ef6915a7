//! The HTTP front-end: thin glue between uploads and the slicing pipeline.

pub mod context;
pub mod endpoints;

use std::{net::SocketAddr, sync::Arc};

use anyhow::{anyhow, Result};
use dropshot::{ApiDescription, ConfigDropshot, HttpServerStarter};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};

use crate::{config::Config, server::context::Context};

/// Create an API description for the server.
pub fn create_api_description() -> Result<ApiDescription<Arc<Context>>> {
    fn register_endpoints(api: &mut ApiDescription<Arc<Context>>) -> Result<(), String> {
        api.register(endpoints::ping).unwrap();
        api.register(endpoints::api_get_schema).unwrap();
        api.register(endpoints::slice_model).unwrap();

        Ok(())
    }

    // Describe the API.
    let tag_config = serde_json::from_str(include_str!("../../openapi/tag-config.json")).unwrap();
    let mut api = ApiDescription::new().tag_config(tag_config);

    if let Err(err) = register_endpoints(&mut api) {
        panic!("failed to register entrypoints: {}", err);
    }

    Ok(api)
}

/// Start the HTTP server on `bind`, returning the server handle and its
/// shared context.
pub async fn create_server(
    bind: &str,
    config: &Config,
    logger: slog::Logger,
) -> Result<(dropshot::HttpServer<Arc<Context>>, Arc<Context>)> {
    let mut api = create_api_description()?;
    let schema = get_openapi(&mut api)?;

    let config_dropshot = ConfigDropshot {
        bind_address: bind.parse()?,
        request_body_max_bytes: 536870912, // 512 MiB of mesh is plenty.
        default_handler_task_mode: dropshot::HandlerTaskMode::CancelOnDisconnect,
    };

    let dropshot_logger = logger.new(slog::o!("component" => "dropshot"));

    let api_context = Arc::new(Context::new(schema, logger, config.clone()));

    let server = HttpServerStarter::new(&config_dropshot, api, api_context.clone(), &dropshot_logger)
        .map_err(|error| anyhow!("failed to create server: {}", error))?
        .start();

    Ok((server, api_context))
}

/// Get the OpenAPI specification for the server.
pub fn get_openapi(api: &mut ApiDescription<Arc<Context>>) -> Result<serde_json::Value> {
    // Create the API schema.
    let mut definition = api.openapi("slice-api", clap::crate_version!());
    definition
        .description("HTTP front-end around an external slicing engine")
        .json()
        .map_err(|e| e.into())
}

/// Run the server until signalled.
pub async fn server(bind: &str, config: &Config, logger: slog::Logger) -> Result<()> {
    let (server, api_context) = create_server(bind, config, logger).await?;
    let addr: SocketAddr = bind.parse()?;

    let responder = libmdns::Responder::new();
    let _svc = responder.register(
        "_slice-api._tcp",
        "Slice Api Server",
        addr.port(),
        &["path=/"],
    );

    // For Cloud run & ctrl+c, shutdown gracefully.
    // "The main process inside the container will receive SIGTERM, and after a grace period,
    // SIGKILL."
    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    let cloned_api_context = api_context.clone();
    tokio::spawn(async move {
        if let Some(sig) = signals.forever().next() {
            slog::info!(cloned_api_context.logger, "received signal: {:?}", sig);
            slog::info!(cloned_api_context.logger, "triggering cleanup...");

            // Exit the process.
            slog::info!(cloned_api_context.logger, "all clean, exiting!");
            std::process::exit(0);
        }
    });

    server.await.map_err(|error| anyhow!("server failed: {}", error))?;

    Ok(())
}
