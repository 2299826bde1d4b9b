//! Application services layer: views, forms, notifications and routing.

pub mod collection;
pub mod console;
pub mod dashboard;
pub mod error;
pub mod forms;
pub mod notifications;
pub mod products;
pub mod records;
pub mod routes;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;
