pub mod card;
pub mod filter;
pub mod lifecycle;
pub mod sorting;

pub use card::{Card, CardId, CardUpdate, NewCard, Priority, State};
pub use filter::{
    Filter, FilterCriteria, FilterField, FilterSet, FilterValue, FilteredCards, Operator,
};
pub use sorting::{sort_cards, sort_for_display, SortField, SortOrder};
