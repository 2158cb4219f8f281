use std::collections::HashMap;

use soapfix_xml::xpath::NamespaceResolver;

/// Bidirectional prefix <-> namespace URI mapping.
///
/// The forward map is authoritative; the reverse map is kept in step with it
/// so every URI has at most one prefix and every prefix at most one URI.
#[derive(Debug, Clone, Default)]
pub struct NamespaceRegistry {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
    /// Prefixes in the order they were first registered.
    order: Vec<String>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `prefix` for `uri`.
    ///
    /// Re-registering a prefix overwrites its URI and keeps its position. A
    /// different prefix already bound to `uri` is evicted.
    pub fn add_namespace_prefix(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        let prefix = prefix.into();
        let uri = uri.into();

        if let Some(previous_uri) = self.forward.get(&prefix) {
            if self.reverse.get(previous_uri) == Some(&prefix) {
                self.reverse.remove(previous_uri);
            }
        }

        if let Some(evicted) = self.reverse.get(&uri).filter(|bound| **bound != prefix).cloned() {
            tracing::debug!(%evicted, %uri, "prefix replaced by a newer binding for the same URI");
            self.forward.remove(&evicted);
            self.order.retain(|known| *known != evicted);
        }

        if !self.forward.contains_key(&prefix) {
            self.order.push(prefix.clone());
        }
        self.reverse.insert(uri.clone(), prefix.clone());
        self.forward.insert(prefix, uri);
    }

    pub fn namespace_uri(&self, prefix: &str) -> Option<&str> {
        self.forward.get(prefix).map(String::as_str)
    }

    pub fn prefix(&self, uri: &str) -> Option<&str> {
        self.reverse.get(uri).map(String::as_str)
    }

    /// Every prefix bound to `uri`; zero or one.
    pub fn prefixes_for(&self, uri: &str) -> Vec<&str> {
        self.prefix(uri).into_iter().collect()
    }

    /// `(prefix, uri)` pairs in registration order.
    pub fn all_bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order.iter().filter_map(|prefix| {
            self.forward
                .get(prefix)
                .map(|uri| (prefix.as_str(), uri.as_str()))
        })
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

impl NamespaceResolver for NamespaceRegistry {
    fn resolve_prefix(&self, prefix: &str) -> Option<String> {
        self.namespace_uri(prefix).map(str::to_owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup_both_directions() {
        let mut registry = NamespaceRegistry::new();
        registry.add_namespace_prefix("m", "urn:orders");

        assert_eq!(registry.namespace_uri("m"), Some("urn:orders"));
        assert_eq!(registry.prefix("urn:orders"), Some("m"));
        assert_eq!(registry.prefixes_for("urn:orders"), vec!["m"]);
        assert!(registry.prefixes_for("urn:other").is_empty());
    }

    #[test]
    fn test_overwrite_prefix_keeps_position_and_drops_old_reverse() {
        let mut registry = NamespaceRegistry::new();
        registry.add_namespace_prefix("a", "urn:one");
        registry.add_namespace_prefix("b", "urn:two");
        registry.add_namespace_prefix("a", "urn:three");

        assert_eq!(registry.namespace_uri("a"), Some("urn:three"));
        assert_eq!(registry.prefix("urn:one"), None);
        assert_eq!(
            registry.all_bindings().collect::<Vec<_>>(),
            vec![("a", "urn:three"), ("b", "urn:two")]
        );
    }

    #[test]
    fn test_rebinding_uri_evicts_older_prefix() {
        let mut registry = NamespaceRegistry::new();
        registry.add_namespace_prefix("old", "urn:orders");
        registry.add_namespace_prefix("new", "urn:orders");

        assert_eq!(registry.namespace_uri("old"), None);
        assert_eq!(registry.prefix("urn:orders"), Some("new"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_binding_twice_is_idempotent() {
        let mut registry = NamespaceRegistry::new();
        registry.add_namespace_prefix("m", "urn:orders");
        registry.add_namespace_prefix("m", "urn:orders");

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.prefix("urn:orders"), Some("m"));
    }

    #[test]
    fn test_clear() {
        let mut registry = NamespaceRegistry::new();
        registry.add_namespace_prefix("m", "urn:orders");
        registry.clear();

        assert!(registry.is_empty());
        assert_eq!(registry.namespace_uri("m"), None);
        assert_eq!(registry.prefix("urn:orders"), None);
        assert_eq!(registry.all_bindings().count(), 0);
    }

    #[test]
    fn test_resolver_reads_live_bindings() {
        let mut registry = NamespaceRegistry::new();
        assert_eq!(registry.resolve_prefix("m"), None);
        registry.add_namespace_prefix("m", "urn:orders");
        assert_eq!(registry.resolve_prefix("m").as_deref(), Some("urn:orders"));
    }
}
