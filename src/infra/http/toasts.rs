use axum::{
    extract::{Form, Path, State},
    http::StatusCode,
    response::{Redirect, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::application::routes::Route;

use super::console::HttpState;
use super::middleware::ConsoleAction;

const RESOURCE: &str = "toasts";

fn outcome(found: bool, done: &'static str) -> &'static str {
    if found { done } else { "missing" }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct DismissForm {
    return_to: String,
}

/// Only known routes are valid redirect targets.
fn return_path(return_to: &str) -> &'static str {
    Route::from_path(return_to)
        .unwrap_or(Route::Dashboard)
        .path()
}

pub(super) async fn dismiss(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
    Form(form): Form<DismissForm>,
) -> Response {
    let removed = state.console.notifications().dismiss(id);
    ConsoleAction::new(RESOURCE, outcome(removed, "dismissed"))
        .attach(Redirect::to(return_path(&form.return_to)))
}

pub(super) async fn hover(State(state): State<HttpState>, Path(id): Path<Uuid>) -> Response {
    let paused = state.console.notifications().hover(id);
    ConsoleAction::new(RESOURCE, outcome(paused, "paused")).attach(StatusCode::NO_CONTENT)
}

pub(super) async fn leave(State(state): State<HttpState>, Path(id): Path<Uuid>) -> Response {
    let resumed = state.console.notifications().unhover(id);
    ConsoleAction::new(RESOURCE, outcome(resumed, "resumed")).attach(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_return_paths_go_home() {
        assert_eq!(return_path("/products"), "/products");
        assert_eq!(return_path("https://evil.example/"), "/");
        assert_eq!(return_path(""), "/");
    }

    #[test]
    fn unknown_toast_ids_report_missing() {
        assert_eq!(outcome(true, "dismissed"), "dismissed");
        assert_eq!(outcome(false, "paused"), "missing");
    }
}
