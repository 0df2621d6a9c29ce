use serde::{Deserialize, Serialize};

/// Generate a newtype wrapper around `String` with standard trait impls.
///
/// Each generated type gets: `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`,
/// `Serialize`/`Deserialize` (transparent), `Display`, `Deref<Target=str>`,
/// `AsRef<str>`, `Borrow<str>`, `From<String>`, `From<&str>`.
macro_rules! newtype_string {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

newtype_string! {
    /// Unique identifier for a recording session (e.g. `"20260728_141502"`).
    SessionId
}

/// Session-level facts broadcast once to every viewer on attach; immutable
/// for the lifetime of the recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: SessionId,
    pub start_wall_time: i64,
    pub shell_command: String,
    pub recording_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_round_trips_through_json() {
        let id = SessionId::new("20260728_141502");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"20260728_141502\"");
        let back: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn session_id_derefs_to_str() {
        let id = SessionId::new("abc");
        assert_eq!(&*id, "abc");
    }
}
