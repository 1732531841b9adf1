//! Context URLs (`@odata.context`).

/// `<root>/$metadata`
pub fn metadata_url(service_root: &str) -> String {
    format!("{}/$metadata", service_root.trim_end_matches('/'))
}

/// Context of a single entity read from a set: `<root>/$metadata#Set/$entity`.
pub fn entity_context(service_root: &str, entity_set: &str) -> String {
    format!("{}#{}/$entity", metadata_url(service_root), entity_set)
}

/// Context of a feed: `<root>/$metadata#Set`.
pub fn feed_context(service_root: &str, entity_set: &str) -> String {
    format!("{}#{}", metadata_url(service_root), entity_set)
}

/// Context of contained navigation content, given the contained path
/// (`<parent id>/<Nav>`). Single-valued content ends in `/$entity`.
pub fn contained_context(service_root: &str, contained_path: &str, is_collection: bool) -> String {
    let root = service_root.trim_end_matches('/');
    let relative = contained_path
        .strip_prefix(root)
        .map(|rest| rest.trim_start_matches('/'))
        .unwrap_or(contained_path);
    if is_collection {
        format!("{}#{}", metadata_url(root), relative)
    } else {
        format!("{}#{}/$entity", metadata_url(root), relative)
    }
}

/// A parsed context URL fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextUrl {
    /// The fragment without a trailing `/$entity`.
    pub path: String,
    /// The fragment ended in `/$entity`.
    pub is_entity: bool,
}

impl ContextUrl {
    /// The leading entity set name of the fragment.
    pub fn entity_set(&self) -> &str {
        let end = self
            .path
            .find(|c: char| c == '/' || c == '(')
            .unwrap_or(self.path.len());
        &self.path[..end]
    }
}

/// Parses a context URL issued under `service_root`.
pub fn parse_context(service_root: &str, url: &str) -> Option<ContextUrl> {
    let prefix = metadata_url(service_root);
    let fragment = url.strip_prefix(prefix.as_str())?.strip_prefix('#')?;
    if fragment.is_empty() {
        return None;
    }
    let (path, is_entity) = match fragment.strip_suffix("/$entity") {
        Some(path) => (path, true),
        None => (fragment, false),
    };
    Some(ContextUrl {
        path: path.to_string(),
        is_entity,
    })
}
