//! Background dialogue generation.
//!
//! Text generation is slow and may call out to an external service, so it
//! never runs on the tick thread. Each request is handed to a worker thread
//! together with a single-slot mailbox (`Mutex<Option<DialogueReply>>`). The
//! worker writes its reply into the slot and touches nothing else; the
//! simulation drains filled slots at the start of its tick and applies the
//! replies to NPC state itself.
//!
//! Cancelled requests are not interrupted. Their mailbox is parked and the
//! reply is discarded once it arrives.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use wayfarer_common::EntityId;

use crate::character::Faction;
use crate::needs::Mood;
use crate::npc::{DialogueLine, Npc, Personality};

/// History lines included in a prompt.
pub const CONTEXT_LINES: usize = 5;

/// Error types for dialogue operations.
#[derive(Debug, Error)]
pub enum DialogueError {
    /// A request for this NPC is still in flight
    #[error("Dialogue already pending for NPC {0}")]
    AlreadyPending(EntityId),
    /// Worker thread could not be started
    #[error("Failed to spawn dialogue worker: {0}")]
    Spawn(#[from] std::io::Error),
    /// Context could not be serialized
    #[error("Failed to build prompt: {0}")]
    Prompt(#[from] serde_json::Error),
    /// The generator gave up
    #[error("Generation failed: {0}")]
    Generation(String),
}

/// Result type for dialogue operations.
pub type DialogueResult<T> = Result<T, DialogueError>;

/// What the generator knows about the speaking NPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueContext {
    /// NPC name
    pub npc_name: String,
    /// NPC faction
    pub faction: Faction,
    /// NPC mood
    pub mood: Mood,
    /// NPC personality
    pub personality: Personality,
    /// Most recent conversation lines, oldest first
    pub history: Vec<DialogueLine>,
}

impl DialogueContext {
    /// Captures the context of an NPC.
    #[must_use]
    pub fn from_npc(npc: &Npc) -> Self {
        let skip = npc.conversation.len().saturating_sub(CONTEXT_LINES);
        Self {
            npc_name: npc.name().to_string(),
            faction: npc.faction(),
            mood: npc.mood(),
            personality: npc.personality.clone(),
            history: npc.conversation[skip..].to_vec(),
        }
    }

    /// Serializes the context as a JSON prompt.
    pub fn to_prompt(&self) -> DialogueResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Work handed to a generator.
#[derive(Debug, Clone)]
pub struct DialogueRequest {
    /// Speaking NPC
    pub npc: EntityId,
    /// Request number, unique per service
    pub ticket: u64,
    /// What the player said
    pub player_message: String,
    /// Speaker context
    pub context: DialogueContext,
}

/// A generated reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueReply {
    /// Speaking NPC
    pub npc: EntityId,
    /// Ticket of the request this answers
    pub ticket: u64,
    /// Reply text
    pub text: String,
}

/// Produces NPC replies. Called from worker threads.
pub trait DialogueGenerator: Send + Sync {
    /// Generates a reply for a request.
    fn generate(&self, request: &DialogueRequest) -> DialogueResult<String>;
}

/// Keyword and personality based replies, used when no other generator is
/// configured and as the fallback when one fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedDialogue;

impl CannedDialogue {
    /// Picks a reply.
    #[must_use]
    pub fn reply(context: &DialogueContext, message: &str) -> String {
        let message = message.to_lowercase();
        let kindness = context.personality.kindness;
        let aggression = context.personality.aggression;

        if message.contains("hello") || message.contains("greetings") {
            if kindness > 70 {
                format!("Hello! Good to meet you, I'm {}.", context.npc_name)
            } else if aggression > 70 {
                format!("What do you want? I'm {}.", context.npc_name)
            } else {
                format!("Hello, I'm {}.", context.npc_name)
            }
        } else if message.contains("quest") || message.contains("work") {
            "I have nothing for you right now.".to_string()
        } else if message.contains("help") {
            "If you need help, ask around town.".to_string()
        } else {
            match context.mood {
                Mood::Happy => "Fine day, isn't it?".to_string(),
                Mood::Stressed => "I'm in no mood to talk.".to_string(),
                Mood::Neutral | Mood::Sad => "Hmm...".to_string(),
            }
        }
    }
}

impl DialogueGenerator for CannedDialogue {
    fn generate(&self, request: &DialogueRequest) -> DialogueResult<String> {
        Ok(Self::reply(&request.context, &request.player_message))
    }
}

/// Single-slot mailbox shared with one worker.
pub type DialogueMailbox = Arc<Mutex<Option<DialogueReply>>>;

#[derive(Debug)]
struct PendingRequest {
    ticket: u64,
    mailbox: DialogueMailbox,
    requested_at: f64,
}

/// Dispatches dialogue requests and collects replies.
pub struct DialogueService {
    generator: Arc<dyn DialogueGenerator>,
    pending: HashMap<EntityId, PendingRequest>,
    orphaned: Vec<DialogueMailbox>,
    next_ticket: u64,
}

impl std::fmt::Debug for DialogueService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogueService")
            .field("pending", &self.pending.len())
            .field("orphaned", &self.orphaned.len())
            .field("next_ticket", &self.next_ticket)
            .finish()
    }
}

impl Default for DialogueService {
    fn default() -> Self {
        Self::new(Arc::new(CannedDialogue))
    }
}

impl DialogueService {
    /// Creates a service around a generator.
    #[must_use]
    pub fn new(generator: Arc<dyn DialogueGenerator>) -> Self {
        Self {
            generator,
            pending: HashMap::new(),
            orphaned: Vec::new(),
            next_ticket: 1,
        }
    }

    /// Starts generating a reply on a worker thread.
    ///
    /// At most one request per NPC may be in flight.
    pub fn request(&mut self, npc: &Npc, player_message: &str, now: f64) -> DialogueResult<u64> {
        let id = npc.id();
        if self.pending.contains_key(&id) {
            return Err(DialogueError::AlreadyPending(id));
        }

        let ticket = self.next_ticket;
        let request = DialogueRequest {
            npc: id,
            ticket,
            player_message: player_message.to_string(),
            context: DialogueContext::from_npc(npc),
        };
        let mailbox: DialogueMailbox = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&mailbox);
        let generator = Arc::clone(&self.generator);

        std::thread::Builder::new()
            .name(format!("dialogue-{ticket}"))
            .spawn(move || {
                let text = generator.generate(&request).unwrap_or_else(|e| {
                    warn!("Dialogue generation for NPC {} failed: {}", request.npc, e);
                    CannedDialogue::reply(&request.context, &request.player_message)
                });
                *slot.lock() = Some(DialogueReply {
                    npc: request.npc,
                    ticket: request.ticket,
                    text,
                });
            })?;

        self.next_ticket += 1;
        self.pending.insert(
            id,
            PendingRequest {
                ticket,
                mailbox,
                requested_at: now,
            },
        );
        debug!("Dialogue request {} dispatched for NPC {}", ticket, id);
        Ok(ticket)
    }

    /// Collects every reply that has arrived. Never blocks on a worker.
    ///
    /// A mailbox whose worker exited without writing (it panicked) is
    /// dropped. The worker count is read before the slot so a reply written
    /// just before exit is still seen.
    pub fn drain(&mut self) -> Vec<DialogueReply> {
        self.orphaned.retain(|mailbox| {
            let worker_gone = Arc::strong_count(mailbox) == 1;
            match mailbox.lock().take() {
                Some(reply) => {
                    debug!("Discarding reply {} for cancelled dialogue", reply.ticket);
                    false
                },
                None => !worker_gone,
            }
        });

        let mut replies = Vec::new();
        self.pending.retain(|npc, pending| {
            let worker_gone = Arc::strong_count(&pending.mailbox) == 1;
            match pending.mailbox.lock().take() {
                Some(reply) => {
                    replies.push(reply);
                    false
                },
                None if worker_gone => {
                    warn!(
                        "Dialogue worker for request {} (NPC {}) exited without a reply",
                        pending.ticket, npc
                    );
                    false
                },
                None => true,
            }
        });
        replies.sort_by_key(|r| r.ticket);
        replies
    }

    /// Cancels the request for an NPC. A late reply is discarded.
    pub fn cancel(&mut self, npc: EntityId) -> bool {
        match self.pending.remove(&npc) {
            Some(pending) => {
                debug!("Dialogue request {} cancelled", pending.ticket);
                self.orphaned.push(pending.mailbox);
                true
            },
            None => false,
        }
    }

    /// Cancels every request older than `max_wait` seconds. Returns the
    /// affected NPCs.
    pub fn abandon_stale(&mut self, now: f64, max_wait: f64) -> Vec<EntityId> {
        let stale: Vec<EntityId> = self
            .pending
            .iter()
            .filter(|(_, p)| now - p.requested_at > max_wait)
            .map(|(id, _)| *id)
            .collect();
        for id in &stale {
            warn!("Dialogue for NPC {} timed out", id);
            self.cancel(*id);
        }
        stale
    }

    /// True while a request for the NPC is in flight.
    #[must_use]
    pub fn is_pending(&self, npc: EntityId) -> bool {
        self.pending.contains_key(&npc)
    }

    /// Number of requests in flight.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Cancelled requests whose worker has not finished yet.
    #[must_use]
    pub fn orphaned_count(&self) -> usize {
        self.orphaned.len()
    }
}
