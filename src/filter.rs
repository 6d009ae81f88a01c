//! Optional allow-lists restricting which teams and shooters are shown.

use serde::{Deserialize, Serialize};

/// Either unset (everything visible) or an explicit list of visible ids.
///
/// Serialized as `null` or an array of ids. Insertion order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisibilityFilter(Option<Vec<String>>);

impl VisibilityFilter {
    /// Filter that lets everything through.
    pub fn unset() -> Self {
        Self(None)
    }

    /// Filter restricted to `ids`; duplicates are dropped.
    pub fn only<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for id in ids {
            let id = id.into();
            if !out.contains(&id) {
                out.push(id);
            }
        }
        Self(Some(out))
    }

    /// True when no restriction is active.
    pub fn is_unset(&self) -> bool {
        self.0.is_none()
    }

    /// True when the filter is unset or contains `id`.
    pub fn is_visible(&self, id: &str) -> bool {
        match &self.0 {
            None => true,
            Some(ids) => ids.iter().any(|v| v == id),
        }
    }

    /// Replaces the filter wholesale; `None` unsets it.
    pub fn set(&mut self, ids: Option<Vec<String>>) {
        *self = match ids {
            None => Self::unset(),
            Some(ids) => Self::only(ids),
        };
    }

    /// Drops `id` from an active filter. Returns true when something was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(ids) = self.0.as_mut() else {
            return false;
        };
        let before = ids.len();
        ids.retain(|v| v != id);
        ids.len() != before
    }

    /// Active ids, `None` when unset.
    pub fn ids(&self) -> Option<&[String]> {
        self.0.as_deref()
    }

    /// Items of `items` that pass the filter, in their original order.
    pub fn apply<'a, T, F>(&self, items: &'a [T], id_of: F) -> Vec<&'a T>
    where
        F: Fn(&T) -> &str,
    {
        items.iter().filter(|item| self.is_visible(id_of(*item))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_shows_everything() {
        let f = VisibilityFilter::unset();
        assert!(f.is_visible("anything"));
        assert_eq!(f.ids(), None);
    }

    #[test]
    fn set_filter_restricts() {
        let mut f = VisibilityFilter::unset();
        f.set(Some(vec!["a".into(), "b".into(), "a".into()]));
        assert!(f.is_visible("a"));
        assert!(!f.is_visible("c"));
        assert_eq!(f.ids().map(<[String]>::len), Some(2));
        f.set(None);
        assert!(f.is_unset());
    }

    #[test]
    fn remove_is_noop_when_unset_or_absent() {
        let mut f = VisibilityFilter::unset();
        assert!(!f.remove("a"));
        assert!(f.is_unset());

        let mut f = VisibilityFilter::only(["a", "b"]);
        assert!(!f.remove("z"));
        assert!(f.remove("a"));
        assert_eq!(f.ids(), Some(&["b".to_string()][..]));
    }

    #[test]
    fn emptied_filter_stays_active() {
        let mut f = VisibilityFilter::only(["a"]);
        f.remove("a");
        assert!(!f.is_unset());
        assert!(!f.is_visible("a"));
    }

    #[test]
    fn serializes_as_null_or_array() {
        assert_eq!(serde_json::to_string(&VisibilityFilter::unset()).unwrap(), "null");
        assert_eq!(serde_json::to_string(&VisibilityFilter::only(["x"])).unwrap(), "[\"x\"]");
        let f: VisibilityFilter = serde_json::from_str("null").unwrap();
        assert!(f.is_unset());
    }
}
