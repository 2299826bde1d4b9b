#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    Users,
    Products,
}

impl Route {
    pub const fn all() -> [Route; 3] {
        [Route::Dashboard, Route::Users, Route::Products]
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Some(Route::Dashboard),
            "/users" => Some(Route::Users),
            "/products" => Some(Route::Products),
            _ => None,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Route::Dashboard => "/",
            Route::Users => "/users",
            Route::Products => "/products",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Route::Dashboard => "Dashboard",
            Route::Users => "Users",
            Route::Products => "Products",
        }
    }
}
