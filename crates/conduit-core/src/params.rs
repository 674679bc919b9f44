//! Captured URI template variables.
//!
//! Variables are stored in capture order using a small-vector optimization,
//! so the common cases (one to four variables) never allocate for the
//! container itself.

use serde::ser::{Serialize, SerializeMap, Serializer};
use smallvec::SmallVec;

/// Maximum number of parameters stored inline (stack allocated).
const INLINE_PARAMS: usize = 4;

/// Variables captured while matching a URI template, in template order.
///
/// # Example
///
/// ```rust
/// use conduit_core::Params;
///
/// let mut params = Params::new();
/// params.push("realm", "root");
/// params.push("id", "42");
///
/// assert_eq!(params.get("id"), Some("42"));
/// assert_eq!(params.get("unknown"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates a new empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a params set with the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: SmallVec::with_capacity(capacity),
        }
    }

    /// Adds a parameter to the set.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value for a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns an iterator over the parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_push_and_get() {
        let mut params = Params::new();
        params.push("id", "123");
        params.push("name", "alice");

        assert_eq!(params.get("id"), Some("123"));
        assert_eq!(params.get("name"), Some("alice"));
        assert_eq!(params.get("unknown"), None);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_params_keep_capture_order() {
        let params: Params = vec![
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "1".to_string()),
        ]
        .into_iter()
        .collect();

        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("b", "2"), ("a", "1")]);
    }

    #[test]
    fn test_params_many_params() {
        let mut params = Params::with_capacity(2);
        for i in 0..10 {
            params.push(format!("key{i}"), format!("value{i}"));
        }

        assert_eq!(params.len(), 10);
        assert_eq!(params.get("key5"), Some("value5"));
    }

    #[test]
    fn test_params_serialize_as_map() {
        let mut params = Params::new();
        params.push("id", "42");
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            serde_json::json!({ "id": "42" })
        );
    }
}
