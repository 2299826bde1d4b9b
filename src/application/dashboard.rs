//! Summary counts across both collections.

use std::sync::Arc;
use std::time::Duration;

use crudboard_api_types::{Product, User};

use crate::cache::{QueryCache, QueryEntry};

use super::collection::{query_collection, settle_within};
use super::products::{Products, distinct_categories};
use super::records::RecordsApi;
use super::users::{Users, count_admins};

pub const DASHBOARD_ERROR_MESSAGE: &str =
    "Unable to fetch data from the API. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_users: usize,
    pub admins: usize,
    pub total_products: usize,
    pub categories: usize,
}

impl DashboardStats {
    pub fn compute(users: &[User], products: &[Product]) -> Self {
        Self {
            total_users: users.len(),
            admins: count_admins(users),
            total_products: products.len(),
            categories: distinct_categories(products),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardState {
    Loading,
    Failed,
    Ready(DashboardStats),
}

impl DashboardState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DashboardState::Loading => "loading",
            DashboardState::Failed => "failed",
            DashboardState::Ready(_) => "ready",
        }
    }

    /// Loading wins over failure, which wins over data.
    pub fn from_entries(
        users: &QueryEntry<Vec<User>>,
        products: &QueryEntry<Vec<Product>>,
    ) -> Self {
        if users.is_loading() || products.is_loading() {
            return DashboardState::Loading;
        }
        if users.is_error() || products.is_error() {
            return DashboardState::Failed;
        }
        match (users.data.as_deref(), products.data.as_deref()) {
            (Some(users), Some(products)) => {
                DashboardState::Ready(DashboardStats::compute(users, products))
            }
            _ => DashboardState::Loading,
        }
    }
}

pub struct Dashboard {
    api: Arc<dyn RecordsApi>,
    cache: QueryCache,
}

impl Dashboard {
    pub fn new(api: Arc<dyn RecordsApi>, cache: QueryCache) -> Self {
        Self { api, cache }
    }

    pub async fn load(&self, wait: Duration) -> DashboardState {
        let users = query_collection::<Users>(&self.cache, &self.api);
        let products = query_collection::<Products>(&self.cache, &self.api);
        let (users, products) =
            tokio::join!(settle_within(users, wait), settle_within(products, wait));
        DashboardState::from_entries(&users, &products)
    }
}
