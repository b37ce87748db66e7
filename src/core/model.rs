//! Trips, their participants and cost components.

use crate::core::currency::CurrencyCode;
use crate::core::error::{BudgetError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Display;
use std::str::FromStr;

pub type TripId = u64;
pub type ComponentId = u64;
pub type ParticipantId = u64;
pub type UserId = u64;

/// Selects components by who pays for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParticipantKey {
    /// Components without an assigned participant.
    Shared,
    Id(ParticipantId),
}

impl Display for ParticipantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParticipantKey::Shared => write!(f, "shared"),
            ParticipantKey::Id(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for ParticipantKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("shared") {
            return Ok(ParticipantKey::Shared);
        }
        s.parse::<ParticipantId>()
            .map(ParticipantKey::Id)
            .map_err(|_| anyhow::anyhow!("Invalid participant: {} (expected an id or \"shared\")", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Participant {
    pub id: ParticipantId,
    #[serde(default)]
    pub trip_id: TripId,
    pub name: String,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CostComponent {
    pub id: ComponentId,
    #[serde(default)]
    pub trip_id: TripId,
    pub name: String,
    pub category_id: u64,
    pub type_id: u64,
    #[serde(default)]
    pub participant_id: Option<ParticipantId>,
    pub base_cost: Decimal,
    pub currency: CurrencyCode,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl CostComponent {
    pub fn participant_key(&self) -> ParticipantKey {
        self.participant_id
            .map_or(ParticipantKey::Shared, ParticipantKey::Id)
    }

    pub fn is_free(&self) -> bool {
        self.base_cost.is_zero()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trip {
    pub id: TripId,
    pub owner_id: UserId,
    pub name: String,
    pub preferred_currency: CurrencyCode,
    pub participants: Vec<Participant>,
    pub components: Vec<CostComponent>,
}

impl Trip {
    /// Builds a trip, claiming every participant and component for it.
    pub fn new(
        id: TripId,
        owner_id: UserId,
        name: &str,
        preferred_currency: CurrencyCode,
        participants: Vec<Participant>,
        components: Vec<CostComponent>,
    ) -> Result<Self> {
        let mut trip = Trip {
            id,
            owner_id,
            name: name.to_string(),
            preferred_currency,
            participants,
            components,
        };
        for participant in &mut trip.participants {
            participant.trip_id = id;
        }
        for component in &mut trip.components {
            component.trip_id = id;
        }
        trip.validate()?;
        Ok(trip)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| BudgetError::InvalidTrip {
            trip_id: self.id,
            reason,
        };

        let mut participant_ids = HashSet::new();
        for participant in &self.participants {
            if !participant_ids.insert(participant.id) {
                return Err(invalid(format!("duplicate participant id {}", participant.id)));
            }
        }

        let mut component_ids = HashSet::new();
        for component in &self.components {
            if !component_ids.insert(component.id) {
                return Err(invalid(format!("duplicate component id {}", component.id)));
            }
            if component.base_cost < Decimal::ZERO {
                return Err(invalid(format!(
                    "component {} has negative cost {}",
                    component.id, component.base_cost
                )));
            }
            if let Some(pid) = component.participant_id {
                if !participant_ids.contains(&pid) {
                    return Err(invalid(format!(
                        "component {} refers to unknown participant {pid}",
                        component.id
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    /// Display name for a participant selector.
    pub fn participant_label(&self, key: ParticipantKey) -> String {
        match key {
            ParticipantKey::Shared => "Shared".to_string(),
            ParticipantKey::Id(id) => self
                .participant(id)
                .map_or_else(|| format!("#{id}"), |p| p.name.clone()),
        }
    }

    /// Removes a participant and detaches it from every component it paid for.
    /// The components stay on the trip as shared costs.
    pub fn remove_participant(&mut self, id: ParticipantId) -> Option<Participant> {
        let index = self.participants.iter().position(|p| p.id == id)?;
        let removed = self.participants.remove(index);
        for component in &mut self.components {
            if component.participant_id == Some(id) {
                component.participant_id = None;
            }
        }
        Some(removed)
    }
}
