//! Operation filter set
//!
//! The reader restricts queries to a set of allowed operation kinds. The
//! set is built from string tokens; tokens that do not name a kind are
//! silently dropped rather than rejected, so permissive caller input (query
//! strings, form values) never turns into an error. An empty set means no
//! filtering at all.

use serde::{Deserialize, Serialize};

use super::entry::OperationKind;

/// De-duplicated, order-preserving set of allowed operation kinds
///
/// # Example
///
/// ```
/// use spoor_core::domain::{OperationFilter, OperationKind};
///
/// let filter = OperationFilter::from_tokens(["insert", "BOGUS", "update", "insert"]);
/// assert_eq!(filter.kinds(), &[OperationKind::Insert, OperationKind::Update]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationFilter {
    kinds: Vec<OperationKind>,
}

impl OperationFilter {
    /// Creates an empty filter (all operation kinds pass)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a filter from tokens, keeping only valid kinds
    ///
    /// Invalid tokens are dropped silently; duplicates are kept once, in
    /// first-seen order. Accepts a single token or a sequence (see
    /// [`IntoOperationTokens`]).
    #[must_use]
    pub fn from_tokens(tokens: impl IntoOperationTokens) -> Self {
        let mut filter = Self::new();
        for token in tokens.into_tokens() {
            if let Ok(kind) = token.parse::<OperationKind>() {
                if !filter.kinds.contains(&kind) {
                    filter.kinds.push(kind);
                }
            }
        }
        filter
    }

    /// Returns the retained kinds in insertion order
    #[must_use]
    pub fn kinds(&self) -> &[OperationKind] {
        &self.kinds
    }

    /// Returns true if no kinds are set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Returns the number of retained kinds
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Returns true if the given kind passes this filter
    ///
    /// An empty filter allows every kind.
    #[must_use]
    pub fn allows(&self, kind: OperationKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }
}

/// Conversion into a list of operation tokens
///
/// Lets `filter_by`-style APIs accept a single token (`"update"`), a
/// sequence of tokens (`["insert", "update"]`), or operation kinds
/// directly, mirroring the permissive input surface of the audit reader.
pub trait IntoOperationTokens {
    /// Converts the input into raw tokens for parsing
    fn into_tokens(self) -> Vec<String>;
}

impl IntoOperationTokens for &str {
    fn into_tokens(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoOperationTokens for String {
    fn into_tokens(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoOperationTokens for OperationKind {
    fn into_tokens(self) -> Vec<String> {
        vec![self.as_str().to_string()]
    }
}

impl<S: Into<String>, const N: usize> IntoOperationTokens for [S; N] {
    fn into_tokens(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<S: Into<String> + Clone> IntoOperationTokens for &[S] {
    fn into_tokens(self) -> Vec<String> {
        self.iter().cloned().map(Into::into).collect()
    }
}

impl<S: Into<String>> IntoOperationTokens for Vec<S> {
    fn into_tokens(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_by_default() {
        let filter = OperationFilter::new();
        assert!(filter.is_empty());
        assert_eq!(filter.kinds(), &[]);
    }

    #[test]
    fn test_unknown_tokens_are_dropped() {
        let filter = OperationFilter::from_tokens("UNKNOWN");
        assert!(filter.is_empty());

        let filter = OperationFilter::from_tokens(["UNKNOWN1", "UNKNOWN2"]);
        assert!(filter.is_empty());
    }

    #[test]
    fn test_single_valid_token() {
        for kind in OperationKind::ALL {
            let filter = OperationFilter::from_tokens(kind.as_str());
            assert_eq!(filter.kinds(), &[kind]);
        }
    }

    #[test]
    fn test_mixed_tokens_keep_valid_in_order() {
        let filter = OperationFilter::from_tokens(["associate", "bogus", "dissociate"]);
        assert_eq!(
            filter.kinds(),
            &[OperationKind::Associate, OperationKind::Dissociate]
        );
    }

    #[test]
    fn test_duplicates_are_kept_once() {
        let filter = OperationFilter::from_tokens(["update", "UPDATE", "update"]);
        assert_eq!(filter.kinds(), &[OperationKind::Update]);
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_kinds_as_input() {
        let filter = OperationFilter::from_tokens(OperationKind::Remove);
        assert_eq!(filter.kinds(), &[OperationKind::Remove]);

        let filter = OperationFilter::from_tokens([OperationKind::Insert, OperationKind::Update]);
        assert_eq!(
            filter.kinds(),
            &[OperationKind::Insert, OperationKind::Update]
        );
    }

    #[test]
    fn test_empty_filter_allows_everything() {
        let filter = OperationFilter::new();
        for kind in OperationKind::ALL {
            assert!(filter.allows(kind));
        }
    }

    #[test]
    fn test_non_empty_filter_restricts() {
        let filter = OperationFilter::from_tokens("insert");
        assert!(filter.allows(OperationKind::Insert));
        assert!(!filter.allows(OperationKind::Remove));
    }
}
