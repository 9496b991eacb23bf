// SSR request handler: every route nothing else answered ends up here.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    response::Response,
};

use crate::config::state::AppState;
use crate::middleware::{body_parser::ParsedBody, error_handler::AppError, request_logger::RequestLogger};
use crate::render::build::{LoadContext, ServerBuild};

/// Resolves the rendering build and lets it answer with the request's load context.
pub async fn ssr_handler(State(state): State<AppState>, req: Request) -> Result<Response, AppError> {
    let build: Arc<dyn ServerBuild> = state.build.resolve().await?;

    let context: LoadContext = LoadContext {
        logger: req
            .extensions()
            .get::<RequestLogger>()
            .cloned()
            .unwrap_or_else(RequestLogger::detached),
        database: state.database.clone(),
        body: req.extensions().get::<ParsedBody>().cloned(),
    };

    build.handle_request(req, context).await
}
