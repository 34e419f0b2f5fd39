//! Directory filtering.
//!
//! Filtering is a pure function over the cached donor list: it never touches
//! the store, and applying the same filter twice yields the same result.

use serde::{Deserialize, Serialize};

use crate::types::{BloodGroup, Donor};

/// Blood group selection in the directory toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GroupFilter {
    /// Show every group.
    #[default]
    All,
    /// Show only donors whose stored group equals this one exactly.
    Group(BloodGroup),
}

impl GroupFilter {
    /// Parse the `group` query parameter. Blank, `All`, and unknown values
    /// mean [`GroupFilter::All`].
    #[must_use]
    pub fn from_query(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("" | "All") => Self::All,
            Some(s) => s.parse().map_or(Self::All, Self::Group),
        }
    }

    /// The query parameter value (`All`, `A+`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Group(group) => group.as_str(),
        }
    }

    fn matches(self, donor: &Donor) -> bool {
        match self {
            Self::All => true,
            Self::Group(group) => donor.group.as_deref() == Some(group.as_str()),
        }
    }
}

/// Active filter: a group selection plus a free-text search.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirectoryFilter {
    pub group: GroupFilter,
    /// Search text, matched case-insensitively against name or city.
    pub search: String,
}

impl DirectoryFilter {
    #[must_use]
    pub fn new(group: GroupFilter, search: impl Into<String>) -> Self {
        Self {
            group,
            search: search.into(),
        }
    }

    /// Whether a single donor passes the filter.
    ///
    /// The search text is matched as entered; only the empty string matches
    /// everything. Missing name or city fields are treated as empty strings,
    /// so a donor with neither never matches a non-empty search.
    #[must_use]
    pub fn matches(&self, donor: &Donor) -> bool {
        if !self.group.matches(donor) {
            return false;
        }
        let needle = self.search.to_lowercase();
        if needle.is_empty() {
            return true;
        }
        donor.name_or_empty().to_lowercase().contains(&needle)
            || donor.city_or_empty().to_lowercase().contains(&needle)
    }
}

/// Apply `filter` to `donors`, preserving their order.
#[must_use]
pub fn filter_donors<'a>(donors: &'a [Donor], filter: &DirectoryFilter) -> Vec<&'a Donor> {
    donors.iter().filter(|donor| filter.matches(donor)).collect()
}
