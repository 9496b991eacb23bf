// Page routes of the front end.

use axum::http::StatusCode;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use crate::middleware::error_handler::AppError;
use crate::render::build::LoadContext;

/// Rendered page fragments, ready to be placed into the document shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub status: StatusCode,
    pub head: String,
    pub body: String,
}

pub async fn render_route(path: &str, context: &LoadContext) -> Result<Page, AppError> {
    match path {
        "/" => index(context).await,
        _ => Err(AppError::not_found()),
    }
}

async fn index(context: &LoadContext) -> Result<Page, AppError> {
    let time: DateTime<Utc> = match &context.database {
        Some(database) => database.now().await?,
        None => Utc::now(),
    };
    debug!(time = %time, "rendering index");

    Ok(Page {
        status: StatusCode::OK,
        head: "<title>App</title>".to_string(),
        body: format!(
            "<div class=\"flex h-screen w-full flex-col items-center justify-center\">\
             <h1 class=\"text-3xl font-bold underline\">Hello!</h1>\
             <p class=\"text-xl font-bold\">{}</p></div>",
            time.to_rfc3339_opts(SecondsFormat::Millis, true)
        ),
    })
}
