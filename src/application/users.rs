use std::sync::Arc;

use crudboard_api_types::{NewUser, Role, User};
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::domain::forms::UserDraft;
use crate::infra::api::ApiError;

use super::collection::{CollectionPage, Resource};
use super::records::RecordsApi;

pub struct Users;

impl Resource for Users {
    const KEY: &'static str = "users";
    const CREATED_MESSAGE: &'static str = "User created successfully!";
    const FAILED_MESSAGE: &'static str = "Failed to create user";
    const LOAD_FAILED_MESSAGE: &'static str = "Error loading users";

    type Record = User;
    type Draft = UserDraft;

    fn list(api: Arc<dyn RecordsApi>) -> BoxFuture<'static, Result<Vec<User>, ApiError>> {
        async move { api.list_users().await }.boxed()
    }

    fn create(
        api: Arc<dyn RecordsApi>,
        payload: NewUser,
    ) -> BoxFuture<'static, Result<User, ApiError>> {
        async move { api.create_user(&payload).await }.boxed()
    }
}

pub type UsersPage = CollectionPage<Users>;

pub fn count_admins(users: &[User]) -> usize {
    users.iter().filter(|user| user.role == Role::Admin).count()
}
