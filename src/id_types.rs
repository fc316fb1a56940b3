use std::fmt;
use std::sync::Arc;

/// A strongly typed identifier for a Room.
/// Wraps an `Arc<String>` for cheap cloning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId(pub Arc<String>);

/// A strongly typed identifier for a Participant.
/// Wraps an `Arc<String>` for cheap cloning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParticipantId(pub Arc<String>);

/// The default room every participant lands in when no room id is supplied on JOIN.
/// This room is never reaped even when empty.
pub const DEFAULT_ROOM_ID: &str = "default-room";

// Implement Display for easy logging
impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Implement conversion from String/&str
impl From<String> for RoomId {
    fn from(s: String) -> Self {
        RoomId(Arc::new(s))
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        RoomId(Arc::new(s.to_string()))
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        ParticipantId(Arc::new(s))
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        ParticipantId(Arc::new(s.to_string()))
    }
}

impl Default for RoomId {
    fn default() -> Self {
        RoomId::from(DEFAULT_ROOM_ID)
    }
}

// Helper for referencing the inner string
impl AsRef<str> for RoomId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ParticipantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Generates a fresh, collision-free-enough participant identifier:
/// `"user-"` followed by nine random base36 characters.
pub fn generate_participant_id() -> ParticipantId {
    use rand::Rng;
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    ParticipantId::from(format!("user-{}", suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_conversion() {
        let id_str = "room-123";
        let id: RoomId = RoomId::from(id_str);
        assert_eq!(id.as_ref(), id_str);

        let id_string = String::from("room-456");
        let id2: RoomId = RoomId::from(id_string.clone());
        assert_eq!(id2.as_ref(), "room-456");
    }

    #[test]
    fn test_participant_id_conversion() {
        let id = ParticipantId::from("user-1");
        assert_eq!(id.to_string(), "user-1");
    }

    #[test]
    fn test_display_trait() {
        let id = RoomId::from("room-string");
        assert_eq!(format!("{}", id), "room-string");
    }

    #[test]
    fn test_default_room_never_changes_name() {
        assert_eq!(RoomId::default().as_ref(), DEFAULT_ROOM_ID);
    }

    #[test]
    fn test_generate_participant_id_shape() {
        let id = generate_participant_id();
        let s = id.to_string();
        assert!(s.starts_with("user-"));
        assert_eq!(s.len(), "user-".len() + 9);
    }

    #[test]
    fn test_generate_participant_id_is_not_constant() {
        let a = generate_participant_id();
        let b = generate_participant_id();
        // Astronomically unlikely to collide; guards against a broken RNG wire-up.
        assert_ne!(a, b);
    }
}
