//! Compact set of selected weekdays.
//!
//! Indices follow the task store's convention: 0 = Sunday … 6 = Saturday.
//! Iteration is always Sunday-first, so expansion order is deterministic.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::DescriptorError;

/// Sunday-first weekday order used for index mapping and iteration.
const SUNDAY_FIRST: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Map a 0 = Sunday index to a [`Weekday`].
pub fn weekday_from_index(index: u8) -> Option<Weekday> {
    SUNDAY_FIRST.get(usize::from(index)).copied()
}

/// Map a [`Weekday`] to its 0 = Sunday index.
pub fn weekday_to_index(day: Weekday) -> u8 {
    // num_days_from_sunday is always 0..=6
    day.num_days_from_sunday() as u8
}

/// A set of weekdays stored as a 7-bit mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Build a set from 0 = Sunday indices. Duplicates are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::WeekdayOutOfRange`] for an index above 6.
    pub fn from_indices<I>(indices: I) -> Result<Self, DescriptorError>
    where
        I: IntoIterator<Item = u8>,
    {
        let mut set = Self::EMPTY;
        for index in indices {
            let day = weekday_from_index(index).ok_or(DescriptorError::WeekdayOutOfRange(index))?;
            set.insert(day);
        }
        Ok(set)
    }

    /// Add `day` to the set.
    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << weekday_to_index(day);
    }

    /// Whether `day` is selected.
    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << weekday_to_index(day)) != 0
    }

    /// Whether no weekday is selected.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of selected weekdays.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Selected weekdays, Sunday first.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        SUNDAY_FIRST.into_iter().filter(|day| self.contains(*day))
    }

    /// Selected weekdays as 0 = Sunday indices, ascending.
    pub fn indices(&self) -> Vec<u8> {
        self.iter().map(weekday_to_index).collect()
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<T: IntoIterator<Item = Weekday>>(iter: T) -> Self {
        let mut set = Self::EMPTY;
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl TryFrom<Vec<u8>> for WeekdaySet {
    type Error = DescriptorError;

    fn try_from(indices: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_indices(indices)
    }
}

impl From<WeekdaySet> for Vec<u8> {
    fn from(set: WeekdaySet) -> Self {
        set.indices()
    }
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|day| day.to_string()).collect();
        f.write_str(&names.join(","))
    }
}
