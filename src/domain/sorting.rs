use crate::domain::card::Card;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::str::FromStr;

/// Fields available for sorting cards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Title,
    State,
    Priority,
    Created,
    Started,
    Finished,
}

/// Sort order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "id" => Ok(SortField::Id),
            "title" => Ok(SortField::Title),
            "state" => Ok(SortField::State),
            "priority" => Ok(SortField::Priority),
            "created" => Ok(SortField::Created),
            "started" => Ok(SortField::Started),
            "finished" => Ok(SortField::Finished),
            _ => Err(format!(
                "Invalid sort field '{}'. Valid fields: id, title, state, priority, created, started, finished",
                s
            )),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Ascending),
            "desc" => Ok(SortOrder::Descending),
            _ => Err(format!(
                "Invalid sort order '{}'. Valid orders: asc, desc",
                s
            )),
        }
    }
}

/// Sorts cards the way a board shows them: by state rank, then priority
/// rank. The sort is stable, so cards with equal keys keep their order.
///
/// # Examples
/// ```
/// use cards_core::domain::card::{Card, CardId, NewCard, State};
/// use cards_core::domain::sorting::sort_for_display;
/// use chrono::Utc;
///
/// let now = Utc::now();
/// let mut cards = vec![
///     Card::create(CardId::new(1), NewCard::new("A").with_state(State::Done), now).unwrap(),
///     Card::create(CardId::new(2), NewCard::new("B"), now).unwrap(),
///     Card::create(CardId::new(3), NewCard::new("C").with_state(State::InProgress), now).unwrap(),
/// ];
///
/// sort_for_display(&mut cards);
/// assert_eq!(cards[0].state, State::InProgress);
/// assert_eq!(cards[2].state, State::Done);
/// ```
pub fn sort_for_display(cards: &mut [Card]) {
    cards.sort_by_key(Card::display_key);
}

/// Sorts a slice of cards in-place on a single field.
pub fn sort_cards(cards: &mut [Card], field: SortField, order: SortOrder) {
    cards.sort_by(|a, b| {
        let cmp = match field {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortField::State => a.state.cmp(&b.state),
            SortField::Priority => a.priority.cmp(&b.priority),
            SortField::Created => a.created_at.cmp(&b.created_at),
            SortField::Started => return compare_option_dates(a.started_at, b.started_at, order),
            SortField::Finished => {
                return compare_option_dates(a.finished_at, b.finished_at, order)
            }
        };

        match order {
            SortOrder::Ascending => cmp,
            SortOrder::Descending => cmp.reverse(),
        }
    });
}

/// Compare Option<DateTime> with None always sorting to end, whichever
/// direction is requested.
fn compare_option_dates(
    a: Option<DateTime<Utc>>,
    b: Option<DateTime<Utc>>,
    order: SortOrder,
) -> Ordering {
    match (a, b) {
        (Some(a_date), Some(b_date)) => match order {
            SortOrder::Ascending => a_date.cmp(&b_date),
            SortOrder::Descending => b_date.cmp(&a_date),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
