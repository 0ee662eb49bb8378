//! Optional query criteria and the predicate sets built from them.
//!
//! A [`FilterSet`] is an ordered list of [`Filter`]s combined with logical
//! AND. The `created_at` bounds are inclusive on both ends even though the
//! operators are reported as `<` and `>`; the echo format is kept for
//! compatibility with existing front ends.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    domain::card::{Card, Priority, State},
    error::{CardsError, Result},
};

pub const STATES_KEY: &str = "states";
pub const PRIORITIES_KEY: &str = "priorities";
pub const LOWEST_CREATE_DATE_KEY: &str = "lowest_create_date";
pub const HIGHEST_CREATE_DATE_KEY: &str = "highest_create_date";

/// Query criteria as supplied by a caller. Every field is optional.
///
/// `None` means the criterion was not supplied. A value set holding no
/// values (`Some(vec![])`) matches no card at all; it is what an empty
/// intersection collapses to and travels as a single `key=` query pair.
/// The `states` and `priorities` builders leave an empty input unsupplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub states: Option<Vec<State>>,
    pub priorities: Option<Vec<Priority>>,
    pub lowest_create_date: Option<NaiveDate>,
    pub highest_create_date: Option<NaiveDate>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn states(mut self, states: impl IntoIterator<Item = State>) -> Self {
        let states: Vec<_> = states.into_iter().collect();
        self.states = (!states.is_empty()).then_some(states);
        self
    }

    pub fn priorities(mut self, priorities: impl IntoIterator<Item = Priority>) -> Self {
        let priorities: Vec<_> = priorities.into_iter().collect();
        self.priorities = (!priorities.is_empty()).then_some(priorities);
        self
    }

    pub fn lowest_create_date(mut self, date: NaiveDate) -> Self {
        self.lowest_create_date = Some(date);
        self
    }

    pub fn highest_create_date(mut self, date: NaiveDate) -> Self {
        self.highest_create_date = Some(date);
        self
    }

    /// Rejects an inverted creation date range.
    pub fn validate(&self) -> Result<()> {
        if let (Some(lowest), Some(highest)) = (self.lowest_create_date, self.highest_create_date)
        {
            if lowest > highest {
                return Err(CardsError::InvalidRange { lowest, highest });
            }
        }
        Ok(())
    }

    /// Encodes the supplied criteria as query pairs. Omitted criteria
    /// produce no pair at all.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        if let Some(date) = self.lowest_create_date {
            pairs.push((LOWEST_CREATE_DATE_KEY.to_string(), date.to_string()));
        }
        if let Some(date) = self.highest_create_date {
            pairs.push((HIGHEST_CREATE_DATE_KEY.to_string(), date.to_string()));
        }
        if let Some(priorities) = &self.priorities {
            push_values(&mut pairs, PRIORITIES_KEY, priorities.iter().map(Priority::as_str));
        }
        if let Some(states) = &self.states {
            push_values(&mut pairs, STATES_KEY, states.iter().map(State::as_str));
        }

        pairs
    }

    /// Parses query pairs back into criteria. Unknown keys are ignored,
    /// unknown enum values and malformed dates are rejected. A blank value
    /// marks its key as supplied without adding to it.
    pub fn from_query<K, V>(pairs: &[(K, V)]) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut criteria = Self::default();

        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                STATES_KEY => {
                    let states = criteria.states.get_or_insert_with(Vec::new);
                    if !value.trim().is_empty() {
                        states.push(value.parse()?);
                    }
                }
                PRIORITIES_KEY => {
                    let priorities = criteria.priorities.get_or_insert_with(Vec::new);
                    if !value.trim().is_empty() {
                        priorities.push(value.parse()?);
                    }
                }
                LOWEST_CREATE_DATE_KEY => {
                    criteria.lowest_create_date = Some(parse_date(LOWEST_CREATE_DATE_KEY, value)?)
                }
                HIGHEST_CREATE_DATE_KEY => {
                    criteria.highest_create_date =
                        Some(parse_date(HIGHEST_CREATE_DATE_KEY, value)?)
                }
                _ => {}
            }
        }

        Ok(criteria)
    }
}

// One pair per value, or a single blank pair for a set that matches nothing.
fn push_values<'a>(
    pairs: &mut Vec<(String, String)>,
    key: &str,
    values: impl ExactSizeIterator<Item = &'a str>,
) {
    if values.len() == 0 {
        pairs.push((key.to_string(), String::new()));
    }
    for value in values {
        pairs.push((key.to_string(), value.to_string()));
    }
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate> {
    value
        .trim()
        .parse::<NaiveDate>()
        .map_err(|e| CardsError::Validation(format!("Invalid {} '{}': {}", key, value, e)))
}

/// Card field a filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    State,
    Priority,
    CreatedAt,
}

/// Comparison reported for a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "in")]
    In,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">")]
    GreaterThan,
}

/// Operand of a filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    States(Vec<State>),
    Priorities(Vec<Priority>),
    Date(NaiveDate),
}

/// A single predicate over a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "FilterRepr", try_from = "FilterRepr")]
pub enum Filter {
    StateIn(Vec<State>),
    PriorityIn(Vec<Priority>),
    /// `created_at` on or after the date.
    CreatedFrom(NaiveDate),
    /// `created_at` on or before the date.
    CreatedUntil(NaiveDate),
}

impl Filter {
    pub fn field(&self) -> FilterField {
        match self {
            Self::StateIn(_) => FilterField::State,
            Self::PriorityIn(_) => FilterField::Priority,
            Self::CreatedFrom(_) | Self::CreatedUntil(_) => FilterField::CreatedAt,
        }
    }

    pub fn operator(&self) -> Operator {
        match self {
            Self::StateIn(_) | Self::PriorityIn(_) => Operator::In,
            Self::CreatedFrom(_) => Operator::GreaterThan,
            Self::CreatedUntil(_) => Operator::LessThan,
        }
    }

    pub fn value(&self) -> FilterValue {
        match self {
            Self::StateIn(states) => FilterValue::States(states.clone()),
            Self::PriorityIn(priorities) => FilterValue::Priorities(priorities.clone()),
            Self::CreatedFrom(date) | Self::CreatedUntil(date) => FilterValue::Date(*date),
        }
    }

    pub fn matches(&self, card: &Card) -> bool {
        match self {
            Self::StateIn(states) => states.contains(&card.state),
            Self::PriorityIn(priorities) => priorities.contains(&card.priority),
            Self::CreatedFrom(date) => card.created_at.date_naive() >= *date,
            Self::CreatedUntil(date) => card.created_at.date_naive() <= *date,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = match self.field() {
            FilterField::State => "state",
            FilterField::Priority => "priority",
            FilterField::CreatedAt => "created_at",
        };
        match self {
            Self::StateIn(states) => {
                let names: Vec<_> = states.iter().map(State::as_str).collect();
                write!(f, "{} in [{}]", field, names.join(", "))
            }
            Self::PriorityIn(priorities) => {
                let names: Vec<_> = priorities.iter().map(Priority::as_str).collect();
                write!(f, "{} in [{}]", field, names.join(", "))
            }
            Self::CreatedFrom(date) => write!(f, "{} >= {}", field, date),
            Self::CreatedUntil(date) => write!(f, "{} <= {}", field, date),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct FilterRepr {
    field: FilterField,
    operator: Operator,
    value: FilterValue,
}

impl From<Filter> for FilterRepr {
    fn from(filter: Filter) -> Self {
        Self {
            field: filter.field(),
            operator: filter.operator(),
            value: filter.value(),
        }
    }
}

impl TryFrom<FilterRepr> for Filter {
    type Error = String;

    fn try_from(repr: FilterRepr) -> std::result::Result<Self, Self::Error> {
        use FilterField as F;
        use FilterValue as V;

        match (repr.field, repr.operator, repr.value) {
            (F::State, Operator::In, V::States(states)) => Ok(Self::StateIn(states)),
            // An empty list always decodes as `States`.
            (F::Priority, Operator::In, V::States(states)) if states.is_empty() => {
                Ok(Self::PriorityIn(Vec::new()))
            }
            (F::Priority, Operator::In, V::Priorities(priorities)) => {
                Ok(Self::PriorityIn(priorities))
            }
            (F::CreatedAt, Operator::GreaterThan, V::Date(date)) => Ok(Self::CreatedFrom(date)),
            (F::CreatedAt, Operator::LessThan, V::Date(date)) => Ok(Self::CreatedUntil(date)),
            (field, operator, value) => Err(format!(
                "unsupported filter: {:?} {:?} {:?}",
                field, operator, value
            )),
        }
    }
}

/// Ordered AND-combination of filters. The empty set matches every card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet(Vec<Filter>);

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the criteria and appends one filter per supplied criterion
    /// in a fixed order: states, priorities, lowest date, highest date.
    pub fn build(criteria: &FilterCriteria) -> Result<Self> {
        criteria.validate()?;

        let mut set = Self::new();
        if let Some(states) = &criteria.states {
            set.push(Filter::StateIn(states.clone()));
        }
        if let Some(priorities) = &criteria.priorities {
            set.push(Filter::PriorityIn(priorities.clone()));
        }
        if let Some(date) = criteria.lowest_create_date {
            set.push(Filter::CreatedFrom(date));
        }
        if let Some(date) = criteria.highest_create_date {
            set.push(Filter::CreatedUntil(date));
        }
        Ok(set)
    }

    /// Parses query pairs and builds a validated set from them.
    pub fn from_query<K, V>(pairs: &[(K, V)]) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::build(&FilterCriteria::from_query(pairs)?)
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        self.to_criteria().to_query()
    }

    /// Collapses the set back into criteria. Repeated filters on the same
    /// field are merged so that the criteria select the same cards.
    pub fn to_criteria(&self) -> FilterCriteria {
        let mut criteria = FilterCriteria::default();

        for filter in &self.0 {
            match filter {
                Filter::StateIn(states) => {
                    criteria.states = Some(match criteria.states.take() {
                        Some(existing) => intersect(existing, states),
                        None => states.clone(),
                    })
                }
                Filter::PriorityIn(priorities) => {
                    criteria.priorities = Some(match criteria.priorities.take() {
                        Some(existing) => intersect(existing, priorities),
                        None => priorities.clone(),
                    })
                }
                Filter::CreatedFrom(date) => {
                    criteria.lowest_create_date = criteria
                        .lowest_create_date
                        .max(Some(*date));
                }
                Filter::CreatedUntil(date) => {
                    criteria.highest_create_date = Some(
                        criteria
                            .highest_create_date
                            .map_or(*date, |existing| existing.min(*date)),
                    );
                }
            }
        }

        criteria
    }

    pub fn push(&mut self, filter: Filter) {
        self.0.push(filter);
    }

    /// Concatenates two sets into one AND-combination.
    pub fn and(mut self, other: FilterSet) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, card: &Card) -> bool {
        self.0.iter().all(|filter| filter.matches(card))
    }

    /// Keeps the matching cards, preserving their order.
    pub fn apply(&self, cards: impl IntoIterator<Item = Card>) -> Vec<Card> {
        cards.into_iter().filter(|card| self.matches(card)).collect()
    }
}

impl<'a> IntoIterator for &'a FilterSet {
    type Item = &'a Filter;
    type IntoIter = std::slice::Iter<'a, Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn intersect<T: PartialEq + Copy>(existing: Vec<T>, other: &[T]) -> Vec<T> {
    existing.into_iter().filter(|v| other.contains(v)).collect()
}

/// Result of a filtered listing: the cards plus the filters that selected
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredCards {
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub filters: FilterSet,
    pub cards: Vec<Card>,
}
