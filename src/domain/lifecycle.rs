//! Card state machine.
//!
//! `start` and `finish` are force operations: they are accepted from any
//! state and always re-stamp their timestamps.

use chrono::{DateTime, Utc};

use crate::{
    domain::card::{Card, CardId, CardUpdate, NewCard, State, MAX_TITLE_LEN},
    error::{CardsError, Result},
};

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(CardsError::Validation("Card title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(CardsError::Validation(format!(
            "Card title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}

impl Card {
    /// Builds a card from creation input, deriving the lifecycle timestamps
    /// from the requested initial state.
    pub fn create(id: CardId, new_card: NewCard, now: DateTime<Utc>) -> Result<Self> {
        validate_title(&new_card.title)?;

        let (started_at, finished_at) = match new_card.state {
            State::Done => (Some(now), Some(now)),
            State::InProgress => (Some(now), None),
            State::Todo => (None, None),
        };

        Ok(Self {
            id,
            title: new_card.title,
            summary: new_card.summary,
            state: new_card.state,
            priority: new_card.priority,
            created_at: now,
            started_at,
            finished_at,
        })
    }

    /// Moves the card to `InProgress`, overwriting `started_at`.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.state = State::InProgress;
        self.started_at = Some(now);
    }

    /// Moves the card to `Done`. A card that was never started gets
    /// `started_at` stamped with the same instant.
    pub fn finish(&mut self, now: DateTime<Utc>) {
        if self.state == State::Todo {
            self.started_at = Some(now);
        }
        self.state = State::Done;
        self.finished_at = Some(now);
    }

    /// Applies the supplied fields only. State, timestamps, id and
    /// `created_at` are never touched.
    pub fn apply_update(&mut self, update: &CardUpdate) -> Result<()> {
        if let Some(title) = &update.title {
            validate_title(title)?;
        }

        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(summary) = &update.summary {
            self.summary = summary.clone();
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        Ok(())
    }
}
