//! Application-specific context (state shared by handler functions).

use crate::slicer::AnySlicer;

/// State shared by every request handler.
pub struct Context {
    /// The OpenAPI schema served at the root.
    pub schema: serde_json::Value,
    /// Root logger for the server.
    pub logger: slog::Logger,
    /// The application configuration.
    pub config: crate::config::Config,
    /// The engine requests are sliced with.
    pub slicer: AnySlicer,
}

impl Context {
    /// Return a new Context.
    pub fn new(schema: serde_json::Value, logger: slog::Logger, config: crate::config::Config) -> Context {
        let slicer = config.slicer.load();
        Context {
            schema,
            logger,
            config,
            slicer,
        }
    }
}
