//! In-memory [`RecordsApi`] for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use crudboard_api_types::{NewProduct, NewUser, Product, RecordId, Role, User};
use reqwest::StatusCode;

use crate::infra::api::ApiError;

use super::records::RecordsApi;

#[derive(Default)]
pub(crate) struct FakeRecords {
    pub users: Mutex<Vec<User>>,
    pub products: Mutex<Vec<Product>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    pub latency: Option<Duration>,
}

impl FakeRecords {
    pub(crate) fn seeded() -> Self {
        let fake = Self::default();
        fake.users.lock().expect("users").extend([
            user(1, "Ann", "ann@example.com", Role::Admin),
            user(2, "Bob", "bob@example.com", Role::User),
        ]);
        fake.products.lock().expect("products").extend([
            product(1, "Hammer", "12.50", "Tools"),
            product(2, "Saw", "20", "Tools"),
            product(3, "Apple", "0.99", "Food"),
        ]);
        fake
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    async fn read(&self, path: &str) -> Result<(), ApiError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(unavailable(path));
        }
        Ok(())
    }

    async fn write(&self, path: &str) -> Result<(), ApiError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable(path));
        }
        Ok(())
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn unavailable(path: &str) -> ApiError {
    ApiError::Status {
        path: path.to_string(),
        status: StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub(crate) fn user(id: i64, name: &str, email: &str, role: Role) -> User {
    User {
        id: RecordId::Int(id),
        name: name.into(),
        email: email.into(),
        role,
    }
}

pub(crate) fn product(id: i64, name: &str, price: &str, category: &str) -> Product {
    Product {
        id: RecordId::Int(id),
        name: name.into(),
        price: price.into(),
        category: category.into(),
    }
}

#[async_trait]
impl RecordsApi for FakeRecords {
    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.read("users").await?;
        Ok(self.users.lock().expect("users").clone())
    }

    async fn create_user(&self, new: &NewUser) -> Result<User, ApiError> {
        self.write("users").await?;
        let mut users = self.users.lock().expect("users");
        let created = user(
            users.len() as i64 + 1,
            &new.name,
            &new.email,
            new.role,
        );
        users.push(created.clone());
        Ok(created)
    }

    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        self.read("products").await?;
        Ok(self.products.lock().expect("products").clone())
    }

    async fn create_product(&self, new: &NewProduct) -> Result<Product, ApiError> {
        self.write("products").await?;
        let mut products = self.products.lock().expect("products");
        let created = product(
            products.len() as i64 + 1,
            &new.name,
            &new.price,
            &new.category,
        );
        products.push(created.clone());
        Ok(created)
    }
}
