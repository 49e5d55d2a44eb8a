use std::fmt;

/// A port's stable identifier: its path relative to the ports tree root,
/// e.g. `www/nginx`. Used as the key into every cache and graph in the
/// crate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Origin(String);

impl Origin {
    pub fn new(origin: impl Into<String>) -> Self {
        let origin = origin.into();
        let trimmed = origin.trim_matches('/');
        Origin(trimmed.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Origin {
    fn from(s: &str) -> Self {
        Origin::new(s)
    }
}

impl From<String> for Origin {
    fn from(s: String) -> Self {
        Origin::new(s)
    }
}

/// Strips a ports-tree root prefix from a path, as the attribute loader
/// does for every dependency field (`LIB_DEPENDS` et al. arrive as
/// `path:/usr/ports/category/name`).
pub fn strip_tree_root<'a>(tree_root: &str, path: &'a str) -> &'a str {
    path.strip_prefix(tree_root)
        .map(|rest| rest.trim_start_matches('/'))
        .unwrap_or(path)
}
