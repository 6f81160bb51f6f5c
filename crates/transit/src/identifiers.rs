//! Identifiers for stops and routes.
//!
//! Backed by `Arc<str>`: a tracking session clones the current stop id into
//! every status snapshot and change event, so clones must stay cheap.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

macro_rules! impl_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new(id: impl AsRef<str>) -> Self {
                Self(Arc::from(id.as_ref()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self::new(id)
            }
        }
    };
}

impl_identifier!(
    /// A stop, unique within its route.
    StopIdentifier
);
impl_identifier!(RouteIdentifier);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_stop_lookup_by_str() {
        let index: HashMap<StopIdentifier, usize> = ["okhotny_ryad", "lubyanka", "chistye_prudy"]
            .into_iter()
            .enumerate()
            .map(|(i, id)| (StopIdentifier::from(id), i))
            .collect();

        assert_eq!(index.get("lubyanka"), Some(&1));
        assert_eq!(index.get(&StopIdentifier::from(String::from("chistye_prudy"))), Some(&2));
        assert_eq!(index.get("kitay_gorod"), None);
    }

    #[test]
    fn test_cloned_stop_id_shares_storage() {
        let id = StopIdentifier::new("lubyanka");
        let snapshot = id.clone();

        assert_eq!(id, snapshot);
        assert!(Arc::ptr_eq(&id.0, &snapshot.0));
    }

    #[test]
    fn test_route_id_renders_as_plain_text() {
        let id = RouteIdentifier::new("sokolnicheskaya");
        assert_eq!(id.to_string(), "sokolnicheskaya");
        assert_eq!(id.as_str(), "sokolnicheskaya");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_is_transparent() {
        let id: StopIdentifier = serde_json::from_str(r#""lubyanka""#).unwrap();
        assert_eq!(id.as_str(), "lubyanka");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""lubyanka""#);
    }
}
