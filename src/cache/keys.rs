use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Names one cached, fetchable dataset (`"users"`, `"products"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Arc<str>);

impl QueryKey {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QueryKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for QueryKey {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<&QueryKey> for QueryKey {
    fn from(value: &QueryKey) -> Self {
        value.clone()
    }
}

impl Borrow<str> for QueryKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}
