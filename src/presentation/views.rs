use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::macros::format_description;

use crate::application::{
    collection::FormSnapshot,
    dashboard::{DASHBOARD_ERROR_MESSAGE, DashboardState},
    error::{ErrorReport, HttpError},
    forms::FormPhase,
    notifications::VisibleNotification,
    routes::Route,
};

/// Seconds between reloads while a page is still waiting for its data.
const LOADING_REFRESH_SECONDS: u64 = 1;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome, path: &str) -> Response {
    let view = LayoutContext::new(chrome, ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        format!("no route for `{path}`"),
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct NavigationLinkView {
    pub label: &'static str,
    pub href: &'static str,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct ToastView {
    pub id: String,
    pub message: String,
    pub severity: &'static str,
    pub created: String,
    pub remaining_ms: u64,
    pub paused: bool,
}

impl From<VisibleNotification> for ToastView {
    fn from(visible: VisibleNotification) -> Self {
        let VisibleNotification {
            notification,
            remaining,
            paused,
        } = visible;
        let created = notification
            .created_at
            .format(format_description!("[hour]:[minute]:[second]"))
            .unwrap_or_default();

        Self {
            id: notification.id.to_string(),
            message: notification.message,
            severity: notification.severity.as_str(),
            created,
            remaining_ms: u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
            paused,
        }
    }
}

/// Everything the layout needs besides the page body.
#[derive(Clone)]
pub struct LayoutChrome {
    pub title: String,
    pub current_path: &'static str,
    pub navigation: Vec<NavigationLinkView>,
    pub toasts: Vec<ToastView>,
    pub refresh_seconds: Option<u64>,
}

impl LayoutChrome {
    pub fn new(active: Option<Route>, notifications: Vec<VisibleNotification>) -> Self {
        let navigation = Route::all()
            .into_iter()
            .map(|route| NavigationLinkView {
                label: route.label(),
                href: route.path(),
                is_active: Some(route) == active,
            })
            .collect();
        let title = match active {
            Some(route) => format!("{} · crudboard", route.label()),
            None => "Not found · crudboard".to_string(),
        };

        Self {
            title,
            current_path: active.unwrap_or(Route::Dashboard).path(),
            navigation,
            toasts: notifications.into_iter().map(ToastView::from).collect(),
            refresh_seconds: None,
        }
    }

    /// Ask the browser to reload until the data has arrived.
    pub fn refreshing(self, loading: bool) -> Self {
        Self {
            refresh_seconds: loading.then_some(LOADING_REFRESH_SECONDS),
            ..self
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub title: String,
    pub current_path: &'static str,
    pub navigation: Vec<NavigationLinkView>,
    pub toasts: Vec<ToastView>,
    pub refresh_seconds: Option<u64>,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            title: chrome.title,
            current_path: chrome.current_path,
            navigation: chrome.navigation,
            toasts: chrome.toasts,
            refresh_seconds: chrome.refresh_seconds,
            content,
        }
    }
}

pub struct DashboardView {
    pub is_loading: bool,
    pub is_error: bool,
    pub error_message: &'static str,
    pub total_users: usize,
    pub admins: usize,
    pub total_products: usize,
    pub categories: usize,
}

impl From<DashboardState> for DashboardView {
    fn from(state: DashboardState) -> Self {
        let mut view = Self {
            is_loading: false,
            is_error: false,
            error_message: DASHBOARD_ERROR_MESSAGE,
            total_users: 0,
            admins: 0,
            total_products: 0,
            categories: 0,
        };
        match state {
            DashboardState::Loading => view.is_loading = true,
            DashboardState::Failed => view.is_error = true,
            DashboardState::Ready(stats) => {
                view.total_users = stats.total_users;
                view.admins = stats.admins;
                view.total_products = stats.total_products;
                view.categories = stats.categories;
            }
        }
        view
    }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub view: LayoutContext<DashboardView>,
}

pub struct SelectOptionView {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

pub struct FieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub input_type: &'static str,
    pub step: Option<&'static str>,
    pub value: String,
    pub is_select: bool,
    pub options: Vec<SelectOptionView>,
}

impl FieldView {
    pub fn input(
        name: &'static str,
        label: &'static str,
        input_type: &'static str,
        value: &str,
    ) -> Self {
        Self {
            name,
            label,
            input_type,
            step: None,
            value: value.to_string(),
            is_select: false,
            options: Vec::new(),
        }
    }

    pub fn number(
        name: &'static str,
        label: &'static str,
        step: &'static str,
        value: &str,
    ) -> Self {
        Self {
            step: Some(step),
            ..Self::input(name, label, "number", value)
        }
    }

    pub fn select(name: &'static str, label: &'static str, options: Vec<SelectOptionView>) -> Self {
        Self {
            name,
            label,
            input_type: "select",
            step: None,
            value: String::new(),
            is_select: true,
            options,
        }
    }
}

pub struct RowView {
    pub key: String,
    pub cells: Vec<String>,
}

pub struct FormView {
    pub is_open: bool,
    pub is_submitting: bool,
    pub toggle_label: &'static str,
    pub toggle_action: &'static str,
    pub submit_action: &'static str,
    pub submit_label: &'static str,
    pub fields: Vec<FieldView>,
}

impl FormView {
    pub fn new<D>(
        snapshot: &FormSnapshot<D>,
        route: Route,
        add_label: &'static str,
        submit_label: &'static str,
        fields: Vec<FieldView>,
    ) -> Self {
        let is_open = snapshot.phase != FormPhase::Closed;
        Self {
            is_open,
            is_submitting: snapshot.phase == FormPhase::Submitting,
            toggle_label: if is_open { "Cancel" } else { add_label },
            toggle_action: form_toggle_path(route),
            submit_action: route.path(),
            submit_label,
            fields,
        }
    }
}

pub struct CollectionView {
    pub heading: &'static str,
    pub is_loading: bool,
    pub is_error: bool,
    pub is_refreshing: bool,
    pub error_message: &'static str,
    pub empty_message: &'static str,
    pub columns: Vec<&'static str>,
    pub rows: Vec<RowView>,
    pub form: FormView,
}

#[derive(Template)]
#[template(path = "collection.html")]
pub struct CollectionTemplate {
    pub view: LayoutContext<CollectionView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub action_href: &'static str,
    pub action_label: &'static str,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist.".to_string(),
            action_href: Route::Dashboard.path(),
            action_label: "Back to dashboard",
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

pub fn form_toggle_path(route: Route) -> &'static str {
    match route {
        Route::Dashboard => "/",
        Route::Users => "/users/form",
        Route::Products => "/products/form",
    }
}
