mod console;
mod middleware;
mod toasts;

pub use console::{HttpState, build_router};
