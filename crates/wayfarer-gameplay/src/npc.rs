//! NPC data and the NPC registry.
//!
//! An [`Npc`] embeds a [`Character`] and adds AI bookkeeping. Optional
//! capabilities (needs, wandering, aggro) are explicit `Option` fields; an
//! NPC without them simply skips the corresponding behavior.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use wayfarer_common::{EntityId, Position, RegistryError, WayfarerError};

use crate::ai::AiState;
use crate::character::{Character, Faction};
use crate::dialogue::DialogueError;
use crate::needs::{Mood, NpcNeeds};

/// Conversation lines kept per NPC.
pub const MAX_CONVERSATION_LINES: usize = 20;

/// Error types for NPC operations.
#[derive(Debug, Error)]
pub enum NpcError {
    /// NPC not found
    #[error("NPC not found: {0}")]
    NotFound(EntityId),
    /// NPC already registered
    #[error("NPC already registered: {0}")]
    AlreadyRegistered(EntityId),
    /// NPC position is NaN or infinite
    #[error("NPC {0} has a non-finite position")]
    InvalidPosition(EntityId),
    /// Dialogue request failed
    #[error("Dialogue error: {0}")]
    Dialogue(#[from] DialogueError),
}

/// Result type for NPC operations.
pub type NpcResult<T> = Result<T, NpcError>;

impl From<NpcError> for WayfarerError {
    fn from(err: NpcError) -> Self {
        match err {
            NpcError::NotFound(id) => RegistryError::MissingEntity(id).into(),
            NpcError::AlreadyRegistered(id) => RegistryError::Duplicate(id).into(),
            NpcError::InvalidPosition(id) => RegistryError::InvalidPosition {
                id,
                x: f32::NAN,
                y: f32::NAN,
            }
            .into(),
            NpcError::Dialogue(e) => WayfarerError::Serialization(e.to_string()),
        }
    }
}

/// Either side of a fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Combatant {
    /// The player character
    Player,
    /// An NPC by id
    Npc(EntityId),
}

/// Personality traits used by dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    /// Free-form trait tags, e.g. "brave"
    pub traits: Vec<String>,
    /// Friendliness (0-100)
    pub kindness: u8,
    /// Aggression (0-100)
    pub aggression: u8,
    /// Occupation
    pub profession: String,
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            traits: Vec::new(),
            kindness: 50,
            aggression: 50,
            profession: "commoner".to_string(),
        }
    }
}

/// One line of conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueLine {
    /// Who spoke
    pub speaker: String,
    /// What was said
    pub message: String,
}

/// A non-player character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Npc {
    /// Stats, position, and combat bookkeeping
    pub character: Character,
    /// Current AI state
    pub ai_state: AiState,
    /// Where the NPC is heading
    pub target_position: Option<Position>,
    /// Movement speed override in units per second
    pub current_speed: Option<f32>,
    /// Needs, for NPCs that have them
    pub needs: Option<NpcNeeds>,
    /// One-shot latch for neutral encounters
    pub encounter_triggered: bool,
    /// Who the NPC is fighting or fleeing from
    pub combat_target: Option<Combatant>,
    /// Anchor for wandering
    pub home: Position,
    /// Wander radius around home, for NPCs that wander
    pub wander_radius: Option<f32>,
    /// Radius within which the NPC starts attacking the player
    pub aggro_radius: Option<f32>,
    /// Time of the last AI decision
    pub last_decision_time: Option<f64>,
    /// Personality
    pub personality: Personality,
    /// Recent conversation, oldest first
    pub conversation: Vec<DialogueLine>,
    /// Overworld army (true) or settlement-local NPC (false)
    pub is_world_entity: bool,
}

impl Npc {
    /// Wraps a character as an idle NPC.
    #[must_use]
    pub fn new(character: Character) -> Self {
        let home = character.position;
        Self {
            character,
            ai_state: AiState::Idle,
            target_position: None,
            current_speed: None,
            needs: None,
            encounter_triggered: false,
            combat_target: None,
            home,
            wander_radius: None,
            aggro_radius: None,
            last_decision_time: None,
            personality: Personality::default(),
            conversation: Vec::new(),
            is_world_entity: true,
        }
    }

    /// Sets the movement speed.
    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.current_speed = Some(speed);
        self
    }

    /// Gives the NPC needs.
    #[must_use]
    pub fn with_needs(mut self, needs: NpcNeeds) -> Self {
        self.needs = Some(needs);
        self
    }

    /// Lets the NPC wander around its home.
    #[must_use]
    pub fn with_wander_radius(mut self, radius: f32) -> Self {
        self.wander_radius = Some(radius);
        self
    }

    /// Makes the NPC attack a player who comes within `radius`.
    #[must_use]
    pub fn with_aggro_radius(mut self, radius: f32) -> Self {
        self.aggro_radius = Some(radius);
        self
    }

    /// Sets the personality.
    #[must_use]
    pub fn with_personality(mut self, personality: Personality) -> Self {
        self.personality = personality;
        self
    }

    /// Marks the NPC as settlement-local.
    #[must_use]
    pub fn local(mut self) -> Self {
        self.is_world_entity = false;
        self
    }

    /// Entity id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.character.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.character.name
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Position {
        self.character.position
    }

    /// Resolved faction.
    #[must_use]
    pub fn faction(&self) -> Faction {
        self.character.faction()
    }

    /// Returns true while health is above zero.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.character.is_alive()
    }

    /// Mood from needs, neutral for NPCs without needs.
    #[must_use]
    pub fn mood(&self) -> Mood {
        self.needs.as_ref().map_or(Mood::Neutral, NpcNeeds::mood)
    }

    /// Appends to the conversation, dropping the oldest line past the cap.
    pub fn add_conversation(&mut self, speaker: impl Into<String>, message: impl Into<String>) {
        self.conversation.push(DialogueLine {
            speaker: speaker.into(),
            message: message.into(),
        });
        if self.conversation.len() > MAX_CONVERSATION_LINES {
            let excess = self.conversation.len() - MAX_CONVERSATION_LINES;
            self.conversation.drain(..excess);
        }
    }
}

/// Registry owning every NPC, iterated in id order.
#[derive(Debug, Default)]
pub struct NpcRegistry {
    npcs: BTreeMap<EntityId, Npc>,
}

impl NpcRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of NPCs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.npcs.len()
    }

    /// Returns whether there are no NPCs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.npcs.is_empty()
    }

    /// Adds an NPC.
    pub fn insert(&mut self, npc: Npc) -> NpcResult<EntityId> {
        let id = npc.id();
        if self.npcs.contains_key(&id) {
            return Err(NpcError::AlreadyRegistered(id));
        }
        if !npc.position().is_finite() {
            return Err(NpcError::InvalidPosition(id));
        }
        self.npcs.insert(id, npc);
        Ok(id)
    }

    /// Removes an NPC.
    pub fn remove(&mut self, id: EntityId) -> NpcResult<Npc> {
        self.npcs.remove(&id).ok_or(NpcError::NotFound(id))
    }

    /// Gets an NPC.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Npc> {
        self.npcs.get(&id)
    }

    /// Gets an NPC mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Npc> {
        self.npcs.get_mut(&id)
    }

    /// Borrows two distinct NPCs mutably at once.
    pub fn pair_mut(&mut self, a: EntityId, b: EntityId) -> Option<(&mut Npc, &mut Npc)> {
        if a == b {
            return None;
        }
        let mut first = None;
        let mut second = None;
        for (id, npc) in &mut self.npcs {
            if *id == a {
                first = Some(npc);
            } else if *id == b {
                second = Some(npc);
            }
        }
        Some((first?, second?))
    }

    /// Returns whether an NPC exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.npcs.contains_key(&id)
    }

    /// Ids in iteration order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.npcs.keys().copied().collect()
    }

    /// Iterates NPCs in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Npc> {
        self.npcs.values()
    }

    /// Iterates NPCs mutably in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Npc> {
        self.npcs.values_mut()
    }

    /// Ids of NPCs within `radius` of `pos`.
    #[must_use]
    pub fn in_range(&self, pos: Position, radius: f32) -> Vec<EntityId> {
        let radius_sq = radius * radius;
        self.npcs
            .values()
            .filter(|npc| npc.position().distance_sq(pos) <= radius_sq)
            .map(Npc::id)
            .collect()
    }

    /// Checks that every NPC has a finite position.
    pub fn validate(&self) -> Result<(), RegistryError> {
        for npc in self.npcs.values() {
            let pos = npc.position();
            if !pos.is_finite() {
                return Err(RegistryError::InvalidPosition {
                    id: npc.id(),
                    x: pos.x,
                    y: pos.y,
                });
            }
        }
        Ok(())
    }
}
