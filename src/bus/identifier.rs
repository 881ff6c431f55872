//! Event Identifiers
//!
//! An identifier is the key listeners are registered under and emissions are
//! matched against. Textual identifiers take part in wildcard matching, opaque
//! identifiers only ever match by equality.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Segment separator for textual identifiers
pub const SEGMENT_SEPARATOR: char = '.';

/// Wildcard marker for textual patterns
pub const WILDCARD: char = '*';

/// Key used for registration and emission
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventId {
    /// Dotted string, may carry wildcard markers when registering
    Textual(String),

    /// Any non-string key, compared by equality only
    Opaque(OpaqueKey),
}

/// Non-textual identifier kinds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OpaqueKey {
    /// Plain integer key
    Int(i64),

    /// Process-unique token
    Symbol(Symbol),

    /// Identity of a shared value
    Ref(RefKey),
}

impl EventId {
    /// Identifier keyed on the identity of a shared value.
    ///
    /// Two identifiers built from clones of the same `Arc` are equal, values
    /// that merely compare equal are not. The identifier keeps the value alive
    /// so its address cannot be reused while the key is registered.
    pub fn by_ref<T: Any + Send + Sync>(value: &Arc<T>) -> Self {
        Self::Opaque(OpaqueKey::Ref(RefKey::new(value)))
    }

    /// Textual content, if any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Textual(text) => Some(text),
            Self::Opaque(_) => None,
        }
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Textual(_))
    }

    /// True for textual identifiers carrying a wildcard marker
    pub fn is_pattern(&self) -> bool {
        self.as_text().is_some_and(|text| text.contains(WILDCARD))
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::Textual(text) => write!(f, "{}", text),
            EventId::Opaque(OpaqueKey::Int(value)) => write!(f, "{}", value),
            EventId::Opaque(OpaqueKey::Symbol(symbol)) => write!(f, "{}", symbol),
            EventId::Opaque(OpaqueKey::Ref(key)) => write!(f, "{}", key),
        }
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self::Textual(value.to_string())
    }
}

impl From<String> for EventId {
    fn from(value: String) -> Self {
        Self::Textual(value)
    }
}

impl From<&String> for EventId {
    fn from(value: &String) -> Self {
        Self::Textual(value.clone())
    }
}

impl From<i64> for EventId {
    fn from(value: i64) -> Self {
        Self::Opaque(OpaqueKey::Int(value))
    }
}

impl From<i32> for EventId {
    fn from(value: i32) -> Self {
        Self::Opaque(OpaqueKey::Int(i64::from(value)))
    }
}

impl From<u32> for EventId {
    fn from(value: u32) -> Self {
        Self::Opaque(OpaqueKey::Int(i64::from(value)))
    }
}

impl From<Symbol> for EventId {
    fn from(value: Symbol) -> Self {
        Self::Opaque(OpaqueKey::Symbol(value))
    }
}

impl From<&Symbol> for EventId {
    fn from(value: &Symbol) -> Self {
        Self::Opaque(OpaqueKey::Symbol(value.clone()))
    }
}

impl From<&EventId> for EventId {
    fn from(value: &EventId) -> Self {
        value.clone()
    }
}

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(1);

/// Process-unique token usable as an identifier.
///
/// Every call to [`Symbol::new`] yields a token that only equals its own
/// clones; the description is informational.
#[derive(Clone)]
pub struct Symbol {
    id: u64,
    description: Option<Arc<str>>,
}

impl Symbol {
    pub fn new() -> Self {
        Self {
            id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed),
            description: None,
        }
    }

    pub fn with_description(description: impl AsRef<str>) -> Self {
        Self {
            description: Some(Arc::from(description.as_ref())),
            ..Self::new()
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl Default for Symbol {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Symbol")
            .field("id", &self.id)
            .field("description", &self.description())
            .finish()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description().unwrap_or(""))
    }
}

/// Pointer identity of a shared value
#[derive(Clone)]
pub struct RefKey {
    value: Arc<dyn Any + Send + Sync>,
}

impl RefKey {
    pub fn new<T: Any + Send + Sync>(value: &Arc<T>) -> Self {
        let value: Arc<dyn Any + Send + Sync> = value.clone();
        Self { value }
    }

    fn address(&self) -> usize {
        Arc::as_ptr(&self.value) as *const () as usize
    }
}

impl PartialEq for RefKey {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for RefKey {}

impl Hash for RefKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl fmt::Debug for RefKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefKey({:#x})", self.address())
    }
}

impl fmt::Display for RefKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<ref {:#x}>", self.address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_textual_conversions() {
        let id = EventId::from("user.login");
        assert_eq!(id, EventId::Textual("user.login".to_string()));
        assert_eq!(id.as_text(), Some("user.login"));
        assert!(id.is_textual());
        assert!(!id.is_pattern());
        assert!(EventId::from("user.*").is_pattern());
    }

    #[test]
    fn test_integer_keys_are_not_textual() {
        let id = EventId::from(42);
        assert!(!id.is_textual());
        assert_eq!(id.as_text(), None);
        assert_ne!(id, EventId::from("42"));
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_symbols_are_unique() {
        let a = Symbol::with_description("ready");
        let b = Symbol::with_description("ready");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(EventId::from(&a), EventId::from(a.clone()));
        assert_eq!(a.to_string(), "Symbol(ready)");
    }

    #[test]
    fn test_ref_keys_compare_by_identity() {
        let first = Arc::new(String::from("payload"));
        let second = Arc::new(String::from("payload"));

        assert_eq!(EventId::by_ref(&first), EventId::by_ref(&first.clone()));
        assert_ne!(EventId::by_ref(&first), EventId::by_ref(&second));
    }

    #[test]
    fn test_function_as_its_own_key() {
        let handler: Arc<dyn Fn() + Send + Sync> = Arc::new(|| {});
        let key = Arc::new(handler.clone());
        assert_eq!(EventId::by_ref(&key), EventId::by_ref(&key));
    }
}
