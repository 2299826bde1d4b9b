//! Server-rendered views.

pub mod pages;
pub mod views;
