//! Seat reservations (spec.md §3, §4.8): a slot held for a session
//! before it completes its `JoinAttempt`, with an expiry deadline.

use std::time::Instant;
use uuid::Uuid;

use crate::lobby::role::Role;

#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub session_id: Uuid,
    pub account_id_hint: Option<Uuid>,
    pub role: Role,
    pub deadline: Instant,
}

impl Reservation {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}
