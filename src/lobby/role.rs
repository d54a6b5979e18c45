//! Entrant role assignment (spec.md §4.5, §4.9).

/// The side/role an entrant occupies within a match. `Any` is a request-time
/// sentinel meaning "let the lobby assign one based on current team
/// balance"; it never appears on a seated [`crate::lobby::entrant::Entrant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Role {
    Any = 0,
    Moderator = 1,
    TeamA = 2,
    TeamB = 3,
    Spectator = 4,
    /// Forced for every non-moderator/spectator entrant in a social mode
    /// match (spec.md §4.5: "for social modes force TeamSocial").
    TeamSocial = 5,
}

impl Role {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Role::Moderator,
            2 => Role::TeamA,
            3 => Role::TeamB,
            4 => Role::Spectator,
            5 => Role::TeamSocial,
            _ => Role::Any,
        }
    }

    /// Whether this role occupies a competitive team slot counted
    /// against `LobbyParameters::max_size`'s team caps.
    pub fn is_team_slot(self) -> bool {
        matches!(self, Role::TeamA | Role::TeamB)
    }
}
