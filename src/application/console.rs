//! The console context shared by every request handler.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{QueryCache, QueryPolicy};
use crate::config::Settings;

use super::dashboard::Dashboard;
use super::notifications::Notifications;
use super::products::ProductsPage;
use super::records::RecordsApi;
use super::users::UsersPage;

#[derive(Debug, Clone, Copy)]
pub struct ConsoleOptions {
    /// Upper bound on how long a page waits for its data before rendering.
    pub render_wait: Duration,
    pub query: QueryPolicy,
    pub auto_dismiss_after: Duration,
}

impl From<&Settings> for ConsoleOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            render_wait: settings.server.render_wait,
            query: QueryPolicy::from(&settings.query),
            auto_dismiss_after: settings.notifications.auto_dismiss_after,
        }
    }
}

/// Owns the query cache, the notification queue and the three views.
/// Cloning shares all of them.
#[derive(Clone)]
pub struct Console {
    cache: QueryCache,
    notifications: Notifications,
    dashboard: Arc<Dashboard>,
    users: Arc<UsersPage>,
    products: Arc<ProductsPage>,
    render_wait: Duration,
}

impl Console {
    pub fn new(api: Arc<dyn RecordsApi>, options: ConsoleOptions) -> Self {
        let cache = QueryCache::new(options.query);
        let notifications = Notifications::new(options.auto_dismiss_after);

        Self {
            dashboard: Arc::new(Dashboard::new(Arc::clone(&api), cache.clone())),
            users: Arc::new(UsersPage::new(
                Arc::clone(&api),
                cache.clone(),
                notifications.clone(),
            )),
            products: Arc::new(ProductsPage::new(api, cache.clone(), notifications.clone())),
            cache,
            notifications,
            render_wait: options.render_wait,
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn users(&self) -> &UsersPage {
        &self.users
    }

    pub fn products(&self) -> &ProductsPage {
        &self.products
    }

    pub fn render_wait(&self) -> Duration {
        self.render_wait
    }
}
