use axum::{
    Router,
    extract::{Form, State},
    http::{StatusCode, Uri},
    middleware,
    response::{Redirect, Response},
    routing::{get, post},
};
use crudboard_api_types::Role;
use serde::Deserialize;

use crate::{
    application::{
        collection::Resource, console::Console, products::Products, routes::Route, users::Users,
    },
    domain::forms::{ProductDraft, UserDraft},
    presentation::{
        pages::{products_view, users_view},
        views::{
            CollectionTemplate, DashboardTemplate, DashboardView, LayoutChrome, LayoutContext,
            render_not_found_response, render_template_response,
        },
    },
};

use super::{
    middleware::{ConsoleAction, log_responses, set_request_context},
    toasts,
};

#[derive(Clone)]
pub struct HttpState {
    pub console: Console,
}

impl HttpState {
    pub fn new(console: Console) -> Self {
        Self { console }
    }

    fn chrome(&self, route: Option<Route>) -> LayoutChrome {
        LayoutChrome::new(route, self.console.notifications().visible())
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/users", get(users_page).post(create_user))
        .route("/users/form", post(toggle_user_form))
        .route("/products", get(products_page).post(create_product))
        .route("/products/form", post(toggle_product_form))
        .route("/toasts/{id}/dismiss", post(toasts::dismiss))
        .route("/toasts/{id}/hover", post(toasts::hover))
        .route("/toasts/{id}/leave", post(toasts::leave))
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn dashboard(State(state): State<HttpState>) -> Response {
    let console = &state.console;
    let loaded = console.dashboard().load(console.render_wait()).await;
    let action = ConsoleAction::new("dashboard", loaded.as_str());
    let view = DashboardView::from(loaded);
    let chrome = state
        .chrome(Some(Route::Dashboard))
        .refreshing(view.is_loading);
    action.attach(render_template_response(
        DashboardTemplate {
            view: LayoutContext::new(chrome, view),
        },
        StatusCode::OK,
    ))
}

async fn users_page(State(state): State<HttpState>) -> Response {
    let page = state.console.users();
    let entry = page.load(state.console.render_wait()).await;
    let view = users_view(&entry, &page.form());
    let chrome = state.chrome(Some(Route::Users)).refreshing(view.is_loading);
    ConsoleAction::new(Users::KEY, entry.status.as_str()).attach(render_template_response(
        CollectionTemplate {
            view: LayoutContext::new(chrome, view),
        },
        StatusCode::OK,
    ))
}

async fn products_page(State(state): State<HttpState>) -> Response {
    let page = state.console.products();
    let entry = page.load(state.console.render_wait()).await;
    let view = products_view(&entry, &page.form());
    let chrome = state
        .chrome(Some(Route::Products))
        .refreshing(view.is_loading);
    ConsoleAction::new(Products::KEY, entry.status.as_str()).attach(render_template_response(
        CollectionTemplate {
            view: LayoutContext::new(chrome, view),
        },
        StatusCode::OK,
    ))
}

async fn toggle_user_form(State(state): State<HttpState>) -> Response {
    let phase = state.console.users().toggle_form();
    ConsoleAction::new(Users::KEY, phase.as_str()).attach(Redirect::to(Route::Users.path()))
}

async fn toggle_product_form(State(state): State<HttpState>) -> Response {
    let phase = state.console.products().toggle_form();
    ConsoleAction::new(Products::KEY, phase.as_str()).attach(Redirect::to(Route::Products.path()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UserForm {
    name: String,
    email: String,
    role: String,
}

impl From<UserForm> for UserDraft {
    fn from(form: UserForm) -> Self {
        Self {
            name: form.name,
            email: form.email,
            role: Role::parse(form.role.trim()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProductForm {
    name: String,
    price: String,
    category: String,
}

impl From<ProductForm> for ProductDraft {
    fn from(form: ProductForm) -> Self {
        Self {
            name: form.name,
            price: form.price,
            category: form.category,
        }
    }
}

async fn create_user(State(state): State<HttpState>, Form(form): Form<UserForm>) -> Response {
    let outcome = state.console.users().submit(form.into()).await;
    ConsoleAction::new(Users::KEY, outcome.as_str()).attach(Redirect::to(Route::Users.path()))
}

async fn create_product(
    State(state): State<HttpState>,
    Form(form): Form<ProductForm>,
) -> Response {
    let outcome = state.console.products().submit(form.into()).await;
    ConsoleAction::new(Products::KEY, outcome.as_str())
        .attach(Redirect::to(Route::Products.path()))
}

async fn not_found(State(state): State<HttpState>, uri: Uri) -> Response {
    render_not_found_response(state.chrome(None), uri.path())
}
