//! # Handler Registry
//!
//! Lookup table from verb to the handlers bound to it, in registration order.
//! The registry is built by its owner at startup; the dispatcher only reads it.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::handler::HandlerEntry;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("verb cannot be empty")]
    EmptyVerb,

    #[error("handler name cannot be empty")]
    EmptyHandlerName,

    #[error("handler '{name}' is already bound to verb '{verb}'")]
    DuplicateHandler { verb: String, name: String },
}

/// Verb-keyed handler table.
///
/// ```rust
/// use logistik::registry::{DispatchOutcome, HandlerEntry, HandlerRegistry};
///
/// let mut registry = HandlerRegistry::new();
/// let entry = HandlerEntry::from_sync("audit", |_payload, _activity| Ok(DispatchOutcome::ok()));
/// registry.register_for_verbs(&["post", "join"], entry).unwrap();
///
/// assert_eq!(registry.handlers_for("post").map(|h| h.len()), Some(1));
/// assert!(registry.handlers_for("leave").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Vec<HandlerEntry>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Bind a handler to a verb, after any handlers already bound to it
    pub fn register(&mut self, verb: &str, entry: HandlerEntry) -> Result<(), RegistryError> {
        self.check(verb, entry.name())?;
        self.bind(verb, entry);
        Ok(())
    }

    /// Bind one handler to several verbs. Either every verb is bound or,
    /// on error, the registry is left unchanged.
    pub fn register_for_verbs(
        &mut self,
        verbs: &[&str],
        entry: HandlerEntry,
    ) -> Result<(), RegistryError> {
        for (i, verb) in verbs.iter().enumerate() {
            self.check(verb, entry.name())?;
            if verbs[..i].contains(verb) {
                return Err(RegistryError::DuplicateHandler {
                    verb: verb.to_string(),
                    name: entry.name().to_string(),
                });
            }
        }

        for verb in verbs {
            self.bind(verb, entry.clone());
        }
        Ok(())
    }

    fn check(&self, verb: &str, name: &str) -> Result<(), RegistryError> {
        if verb.trim().is_empty() {
            return Err(RegistryError::EmptyVerb);
        }
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyHandlerName);
        }

        let already_bound = self
            .handlers
            .get(verb)
            .is_some_and(|bound| bound.iter().any(|existing| existing.name() == name));
        if already_bound {
            return Err(RegistryError::DuplicateHandler {
                verb: verb.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn bind(&mut self, verb: &str, entry: HandlerEntry) {
        let bound = self.handlers.entry(verb.to_string()).or_default();
        info!(
            verb = %verb,
            handler = %entry.name(),
            position = bound.len(),
            "Registering activity handler"
        );
        bound.push(entry);
    }

    /// Remove a handler from a verb; returns whether it was bound
    pub fn unregister(&mut self, verb: &str, name: &str) -> bool {
        let Some(bound) = self.handlers.get_mut(verb) else {
            return false;
        };

        let before = bound.len();
        bound.retain(|entry| entry.name() != name);
        let removed = bound.len() != before;

        if bound.is_empty() {
            self.handlers.remove(verb);
        }

        if removed {
            debug!(verb = %verb, handler = %name, "Unregistered activity handler");
        } else {
            warn!(verb = %verb, handler = %name, "Handler was not bound to verb");
        }
        removed
    }

    /// Handlers bound to a verb in registration order
    pub fn handlers_for(&self, verb: &str) -> Option<&[HandlerEntry]> {
        self.handlers
            .get(verb)
            .filter(|bound| !bound.is_empty())
            .map(Vec::as_slice)
    }

    pub fn contains_verb(&self, verb: &str) -> bool {
        self.handlers_for(verb).is_some()
    }

    /// Registered verbs, sorted
    pub fn verbs(&self) -> Vec<&str> {
        let mut verbs: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        verbs.sort_unstable();
        verbs
    }

    /// Total number of verb bindings
    pub fn binding_count(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DispatchOutcome;

    fn entry(name: &str) -> HandlerEntry {
        HandlerEntry::from_sync(name, |_payload, _activity| Ok(DispatchOutcome::ok()))
    }

    #[test]
    fn test_registration_order_is_preserved() {
        let mut registry = HandlerRegistry::new();
        registry.register("post", entry("first")).unwrap();
        registry.register("post", entry("second")).unwrap();
        registry.register("post", entry("third")).unwrap();

        let names: Vec<&str> = registry
            .handlers_for("post")
            .unwrap()
            .iter()
            .map(HandlerEntry::name)
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_invalid_registrations() {
        let mut registry = HandlerRegistry::new();
        assert_eq!(registry.register("", entry("a")), Err(RegistryError::EmptyVerb));
        assert_eq!(
            registry.register("post", entry(" ")),
            Err(RegistryError::EmptyHandlerName)
        );

        registry.register("post", entry("a")).unwrap();
        assert!(matches!(
            registry.register("post", entry("a")),
            Err(RegistryError::DuplicateHandler { .. })
        ));
    }

    #[test]
    fn test_multi_verb_binding_is_all_or_nothing() {
        let mut registry = HandlerRegistry::new();
        registry.register("join", entry("audit")).unwrap();

        let result = registry.register_for_verbs(&["post", "join"], entry("audit"));
        assert!(matches!(result, Err(RegistryError::DuplicateHandler { .. })));
        assert!(!registry.contains_verb("post"));
        assert_eq!(registry.binding_count(), 1);

        let result = registry.register_for_verbs(&["like", "like"], entry("audit"));
        assert!(matches!(result, Err(RegistryError::DuplicateHandler { .. })));
        assert!(!registry.contains_verb("like"));

        assert_eq!(
            registry.register_for_verbs(&["share", ""], entry("audit")),
            Err(RegistryError::EmptyVerb)
        );
        assert!(!registry.contains_verb("share"));
    }

    #[test]
    fn test_multi_verb_binding_and_unregister() {
        let mut registry = HandlerRegistry::new();
        registry
            .register_for_verbs(&["post", "join"], entry("audit"))
            .unwrap();
        registry.register("post", entry("search")).unwrap();

        assert_eq!(registry.verbs(), vec!["join", "post"]);
        assert_eq!(registry.binding_count(), 3);

        assert!(registry.unregister("join", "audit"));
        assert!(!registry.contains_verb("join"));
        assert!(!registry.unregister("join", "audit"));
        assert_eq!(registry.handlers_for("post").unwrap().len(), 2);
    }
}
