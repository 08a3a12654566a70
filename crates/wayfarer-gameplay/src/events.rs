//! Event bus for reporting simulation changes to the host.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use tracing::warn;

use wayfarer_common::EntityId;
use wayfarer_world::SettlementId;

use crate::ai::AiState;
use crate::combat::CombatResult;
use crate::encounter::{CombatOutcome, EncounterKind};
use crate::npc::Combatant;

/// Event types that can be sent through the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// An NPC changed AI state
    AiStateChanged {
        /// NPC
        npc: EntityId,
        /// Previous state
        from: AiState,
        /// New state
        to: AiState,
    },
    /// An attack passed the cooldown gate and was rolled
    AttackResolved {
        /// Attacker
        attacker: Combatant,
        /// Defender
        defender: Combatant,
        /// Damage applied
        damage: f32,
        /// Whether damage was applied
        hit: bool,
        /// Whether the hit was critical
        critical: bool,
        /// Whether the defender blocked
        blocked: bool,
    },
    /// The player met an NPC
    EncounterRaised {
        /// Encounter classification
        kind: EncounterKind,
        /// NPC involved
        npc: EntityId,
    },
    /// A battle ended
    CombatEnded {
        /// Opposing NPC
        npc: EntityId,
        /// Outcome
        outcome: CombatOutcome,
    },
    /// A dialogue reply was applied to an NPC
    DialogueDelivered {
        /// Speaking NPC
        npc: EntityId,
        /// Reply text
        text: String,
    },
    /// The player arrived at a settlement
    SettlementReached {
        /// Settlement
        settlement: SettlementId,
    },
}

impl SimEvent {
    /// Builds an [`SimEvent::AttackResolved`] from a resolver result.
    #[must_use]
    pub fn attack(attacker: Combatant, defender: Combatant, result: &CombatResult) -> Self {
        Self::AttackResolved {
            attacker,
            defender,
            damage: result.damage_dealt,
            hit: result.hit,
            critical: result.was_critical,
            blocked: result.was_blocked,
        }
    }
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<SimEvent>,
    /// Receiver for collecting events
    receiver: Receiver<SimEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event to the bus. Never blocks; drops the event when full.
    pub fn publish(&self, event: SimEvent) {
        if let Err(TrySendError::Full(event)) = self.sender.try_send(event) {
            warn!("Event bus full, dropping {:?}", event);
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<SimEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<SimEvent> {
        self.sender.clone()
    }
}
