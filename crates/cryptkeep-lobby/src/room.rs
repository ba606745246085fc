//! Room membership and ownership.
//!
//! A room is plain data owned by the registry actor. Every mutation happens
//! inside the actor's command loop, so membership changes and the
//! broadcasts that describe them can never interleave.

use std::collections::BTreeMap;

use cryptkeep_protocol::{ParticipantHandle, ParticipantId, ParticipantSummary, RoomId, RoomSummary};

/// What a departure did to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Departure {
    /// The participant was not a member.
    NotMember,
    /// A member other than the owner left.
    Left,
    /// The owner left; ownership moved to the longest-standing member.
    OwnerChanged(ParticipantId),
    /// The last member left.
    Emptied,
}

/// The room's current game and which start it belongs to.
pub(crate) struct ActiveGame<G> {
    pub game: G,
    pub generation: u64,
}

pub(crate) struct Room<G> {
    id: RoomId,
    owner: ParticipantId,
    /// In join order.
    members: Vec<ParticipantId>,
    pub game: Option<ActiveGame<G>>,
}

impl<G> Room<G> {
    /// A room whose owner is its only member.
    pub fn new(id: RoomId, owner: ParticipantId) -> Self {
        Self {
            id,
            owner,
            members: vec![owner],
            game: None,
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn owner(&self) -> ParticipantId {
        self.owner
    }

    pub fn members(&self) -> &[ParticipantId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.members.contains(&id)
    }

    pub fn game_running(&self) -> bool {
        self.game.is_some()
    }

    /// Adds a member. Returns `false` if already present.
    pub fn add(&mut self, id: ParticipantId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.members.push(id);
        true
    }

    pub fn remove(&mut self, id: ParticipantId) -> Departure {
        let Some(index) = self.members.iter().position(|m| *m == id) else {
            return Departure::NotMember;
        };
        self.members.remove(index);
        match self.members.first() {
            None => Departure::Emptied,
            Some(next) if id == self.owner => {
                self.owner = *next;
                Departure::OwnerChanged(*next)
            }
            Some(_) => Departure::Left,
        }
    }

    /// Lobby listing. Members missing from `participants` are skipped.
    pub fn summary(&self, participants: &BTreeMap<ParticipantId, ParticipantHandle>) -> RoomSummary {
        let describe = |id: ParticipantId| {
            participants
                .get(&id)
                .map(ParticipantHandle::summary)
                .unwrap_or(ParticipantSummary {
                    id,
                    nickname: String::new(),
                })
        };
        RoomSummary {
            id: self.id,
            owner: describe(self.owner),
            members: self
                .members
                .iter()
                .filter(|m| participants.contains_key(m))
                .map(|m| describe(*m))
                .collect(),
            game_running: self.game_running(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u64) -> ParticipantId {
        ParticipantId(id)
    }

    fn room() -> Room<()> {
        Room::new(RoomId(1), pid(1))
    }

    #[test]
    fn test_new_room_owner_is_member() {
        let room = room();
        assert_eq!(room.owner(), pid(1));
        assert_eq!(room.members(), &[pid(1)]);
        assert!(!room.game_running());
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let mut room = room();
        assert!(room.add(pid(2)));
        assert!(!room.add(pid(2)));
        assert_eq!(room.len(), 2);
    }

    #[test]
    fn test_remove_owner_transfers_to_oldest_member() {
        let mut room = room();
        room.add(pid(3));
        room.add(pid(2));
        assert_eq!(room.remove(pid(1)), Departure::OwnerChanged(pid(3)));
        assert_eq!(room.owner(), pid(3));
    }

    #[test]
    fn test_remove_member_keeps_owner() {
        let mut room = room();
        room.add(pid(2));
        assert_eq!(room.remove(pid(2)), Departure::Left);
        assert_eq!(room.owner(), pid(1));
    }

    #[test]
    fn test_remove_last_member_empties() {
        let mut room = room();
        assert_eq!(room.remove(pid(1)), Departure::Emptied);
        assert_eq!(room.remove(pid(1)), Departure::NotMember);
    }

    #[test]
    fn test_summary_lists_members_in_join_order() {
        let mut room = room();
        room.add(pid(2));
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let participants: BTreeMap<_, _> = [(1, "ada"), (2, "bo")]
            .into_iter()
            .map(|(id, name)| (pid(id), ParticipantHandle::new(pid(id), name, tx.clone())))
            .collect();
        let summary = room.summary(&participants);
        assert_eq!(summary.owner.nickname, "ada");
        let names: Vec<_> = summary.members.iter().map(|m| m.nickname.as_str()).collect();
        assert_eq!(names, ["ada", "bo"]);
        assert!(!summary.game_running);
    }
}
