//! Structured notifications published by the orchestrating service.
//!
//! Presentation code subscribes through an [`EventSink`] instead of being poked
//! from inside the engines. Engines themselves stay silent; only
//! [`GameEngine`](crate::GameEngine) publishes.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::player::PlayerId;

/// Inline tag set; most events carry one or two tags.
pub type EventTags = SmallVec<[String; 4]>;

/// Stable, monotonically increasing identifier for a published event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId {
    pub seq: u64,
}

impl EventId {
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self { seq }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PlayerRegistered,
    MatchFound,
    TurnResolved,
    BattleFinished,
    LevelUp,
    ItemEnhanced,
    ItemPurchased,
    ItemSold,
    ItemEquipped,
    PowerStonePurchased,
    BossDamaged,
    BossDefeated,
    CasinoSettled,
    QuestProgressed,
    QuestRewardClaimed,
    ChallengeResolved,
    FarmResolved,
    DailyReset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Info,
    Notable,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiSurfaceHint {
    Log,
    Toast,
    Modal,
}

/// Event delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineEvent {
    pub id: EventId,
    pub kind: EventKind,
    pub severity: EventSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
    /// Stable tags such as `arena`, `casino` or `boss`.
    #[serde(default)]
    pub tags: EventTags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_surface_hint: Option<UiSurfaceHint>,
    /// Optional i18n key for presentation-layer rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_key: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl EngineEvent {
    /// Unsequenced event; the sink assigns the id on publish.
    #[must_use]
    pub fn new(kind: EventKind, player_id: Option<PlayerId>) -> Self {
        Self {
            id: EventId::new(0),
            kind,
            severity: EventSeverity::Info,
            player_id,
            tags: EventTags::new(),
            ui_surface_hint: None,
            ui_key: None,
            payload: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn tagged(mut self, tag: &str) -> Self {
        if !self.tags.iter().any(|existing| existing == tag) {
            self.tags.push(tag.to_string());
        }
        self
    }

    #[must_use]
    pub const fn severity(mut self, severity: EventSeverity) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub fn surface(mut self, hint: UiSurfaceHint, ui_key: impl Into<String>) -> Self {
        self.ui_surface_hint = Some(hint);
        self.ui_key = Some(ui_key.into());
        self
    }

    /// Attach a serializable payload; serialization failures leave the payload empty.
    #[must_use]
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload = serde_json::to_value(payload).unwrap_or(serde_json::Value::Null);
        self
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|existing| existing == tag)
    }
}

/// Subscriber for engine notifications.
pub trait EventSink {
    fn publish(&mut self, event: EngineEvent);
}

/// Collects events in publish order, assigning sequence ids.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<EngineEvent>,
    next_seq: u64,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &EngineEvent> {
        self.events.iter().filter(move |event| event.kind == kind)
    }
}

impl EventSink for EventLog {
    fn publish(&mut self, mut event: EngineEvent) {
        self.next_seq = self.next_seq.saturating_add(1);
        event.id = EventId::new(self.next_seq);
        self.events.push(event);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&mut self, _event: EngineEvent) {}
}
