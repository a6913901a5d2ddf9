//! A packet recipient that resolves to a set of players at send time
//! (spec.md §3 `BlockView.audiences`, GLOSSARY "Audience"). Views own
//! membership in this shape, not a flattened player set, so a group
//! audience tracks its source (a permission group, a party) rather than
//! a snapshot that goes stale as players log in and out.

use viewforge_types::PlayerId;

use crate::host::PlayerHost;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Audience {
    Player(PlayerId),
    Group(Vec<PlayerId>),
}

impl Audience {
    /// Flattens to the currently online player set. Offline players are
    /// dropped here so callers never have to special-case them again
    /// before a send.
    pub fn resolve(&self, hosts: &dyn PlayerHost) -> Vec<PlayerId> {
        match self {
            Audience::Player(id) => {
                if hosts.is_online(*id) {
                    vec![*id]
                } else {
                    Vec::new()
                }
            }
            Audience::Group(ids) => ids.iter().copied().filter(|id| hosts.is_online(*id)).collect(),
        }
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        match self {
            Audience::Player(id) => *id == player,
            Audience::Group(ids) => ids.contains(&player),
        }
    }
}
