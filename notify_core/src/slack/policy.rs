use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{AsRefStr, Display, EnumIter};

/// Decides whether a send creates a new message, edits the thread parent, or
/// both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, AsRefStr, EnumIter)]
pub enum DeliveryPolicy {
    /// Always create a new message.
    #[default]
    Post,
    /// Create on the first occurrence of a grouping key, then reply in the
    /// thread and update the parent.
    PostAndUpdate,
    /// Update the parent if there is one, otherwise create it.
    Update,
}

impl DeliveryPolicy {
    pub fn posts_when_threaded(&self) -> bool {
        matches!(self, DeliveryPolicy::Post | DeliveryPolicy::PostAndUpdate)
    }

    pub fn updates_when_threaded(&self) -> bool {
        matches!(self, DeliveryPolicy::Update | DeliveryPolicy::PostAndUpdate)
    }
}

/// Lenient parse: anything but the three literals is `Post`.
impl FromStr for DeliveryPolicy {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "PostAndUpdate" => DeliveryPolicy::PostAndUpdate,
            "Update" => DeliveryPolicy::Update,
            _ => DeliveryPolicy::Post,
        })
    }
}

impl Serialize for DeliveryPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_ref())
    }
}

impl<'de> Deserialize<'de> for DeliveryPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PolicyVisitor;

        impl serde::de::Visitor<'_> for PolicyVisitor {
            type Value = DeliveryPolicy;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a delivery policy name")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                let Ok(policy) = v.parse::<DeliveryPolicy>();
                Ok(policy)
            }
        }

        deserializer.deserialize_str(PolicyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_string_round_trip() {
        for policy in DeliveryPolicy::iter() {
            let parsed: DeliveryPolicy = policy.to_string().parse().unwrap();
            assert_eq!(parsed, policy);
        }
        assert_eq!(DeliveryPolicy::PostAndUpdate.to_string(), "PostAndUpdate");
    }

    #[test]
    fn test_unknown_strings_are_post() {
        for name in ["", "post", "update", "Delete", "PostAndUpdate ", "garbage"] {
            assert_eq!(name.parse::<DeliveryPolicy>(), Ok(DeliveryPolicy::Post));
        }
    }

    #[test]
    fn test_json_round_trip() {
        for policy in DeliveryPolicy::iter() {
            let json = serde_json::to_string(&policy).unwrap();
            assert_eq!(json, format!("\"{policy}\""));
            let back: DeliveryPolicy = serde_json::from_str(&json).unwrap();
            assert_eq!(back, policy);
        }
    }

    #[test]
    fn test_json_unknown_value_is_post() {
        let policy: DeliveryPolicy = serde_json::from_str("\"Broadcast\"").unwrap();
        assert_eq!(policy, DeliveryPolicy::Post);
    }

    #[test]
    fn test_json_non_string_fails() {
        assert!(serde_json::from_str::<DeliveryPolicy>("3").is_err());
    }

    #[test]
    fn test_branch_predicates() {
        assert!(DeliveryPolicy::Post.posts_when_threaded());
        assert!(!DeliveryPolicy::Post.updates_when_threaded());
        assert!(DeliveryPolicy::PostAndUpdate.posts_when_threaded());
        assert!(DeliveryPolicy::PostAndUpdate.updates_when_threaded());
        assert!(!DeliveryPolicy::Update.posts_when_threaded());
        assert!(DeliveryPolicy::Update.updates_when_threaded());
    }
}
