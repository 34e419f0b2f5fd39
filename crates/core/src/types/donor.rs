//! Donor records.
//!
//! [`Donor`] is a record as read back from the directory: every field except
//! the ID may be absent because the store does not enforce a schema.
//! [`NewDonor`] is a validated record about to be inserted.

use core::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::blood_group::{BloodGroup, BloodGroupError};
use super::id::DonorId;
use super::phone::{self, Phone, PhoneError};

/// Sentinel stored when the last donation date is unknown.
pub const NOT_AVAILABLE: &str = "N/A";

/// Date format of the add form's date input and of stored dates.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Days past the UTC creation date still accepted as a last-donated date, so
/// a donor ahead of UTC can enter their own local today.
const FUTURE_DATE_TOLERANCE_DAYS: i64 = 1;

/// Latest last-donated date accepted for a record created at `now`.
#[must_use]
pub fn latest_last_donated(now: DateTime<Utc>) -> NaiveDate {
    (now + Duration::days(FUTURE_DATE_TOLERANCE_DAYS)).date_naive()
}

/// Errors raised while validating a new donor.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DonorError {
    /// Name is blank.
    #[error("name is required")]
    MissingName,
    /// City is blank.
    #[error("city is required")]
    MissingCity,
    /// Group is not one of the eight blood groups.
    #[error(transparent)]
    InvalidGroup(#[from] BloodGroupError),
    /// Phone failed validation.
    #[error(transparent)]
    InvalidPhone(#[from] PhoneError),
    /// Last-donated date is not `YYYY-MM-DD`.
    #[error("last donated must be a date (YYYY-MM-DD), got '{0}'")]
    InvalidLastDonated(String),
    /// Last-donated date lies after [`latest_last_donated`].
    #[error("last donated date cannot be in the future")]
    LastDonatedInFuture,
}

/// When the donor last gave blood.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LastDonated {
    /// Unknown; stored as `"N/A"`.
    #[default]
    NotAvailable,
    /// A calendar date.
    Date(NaiveDate),
    /// A stored value that is neither `"N/A"` nor a date. Kept for display.
    Other(String),
}

impl LastDonated {
    /// Interpret a stored value. Missing and blank values are `NotAvailable`.
    #[must_use]
    pub fn from_stored(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("" | NOT_AVAILABLE) => Self::NotAvailable,
            Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                .map_or_else(|_| Self::Other(s.to_owned()), Self::Date),
        }
    }

    /// Interpret the add form's optional date input.
    ///
    /// # Errors
    ///
    /// Returns `DonorError::InvalidLastDonated` for non-blank input that is not
    /// a `YYYY-MM-DD` date.
    pub fn from_form(value: &str) -> Result<Self, DonorError> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(Self::NotAvailable);
        }
        NaiveDate::parse_from_str(value, DATE_FORMAT)
            .map(Self::Date)
            .map_err(|_| DonorError::InvalidLastDonated(value.to_owned()))
    }

    /// The value written to the store.
    #[must_use]
    pub fn to_stored(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LastDonated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAvailable => f.write_str(NOT_AVAILABLE),
            Self::Date(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// A donor record read from the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donor {
    /// Store-assigned document ID.
    pub id: DonorId,
    pub name: Option<String>,
    /// Stored blood group, verbatim (may be outside the known set).
    pub group: Option<String>,
    pub city: Option<String>,
    /// Stored phone, verbatim.
    pub phone: Option<String>,
    pub last_donated: LastDonated,
    pub created_at: Option<DateTime<Utc>>,
}

impl Donor {
    /// Name, or the empty string when absent.
    #[must_use]
    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// City, or the empty string when absent.
    #[must_use]
    pub fn city_or_empty(&self) -> &str {
        self.city.as_deref().unwrap_or_default()
    }

    /// Group, or the empty string when absent.
    #[must_use]
    pub fn group_or_empty(&self) -> &str {
        self.group.as_deref().unwrap_or_default()
    }

    /// `tel:` link for the call action.
    #[must_use]
    pub fn tel_href(&self) -> String {
        phone::tel_href(self.phone.as_deref().unwrap_or_default())
    }

    /// Messaging link for the chat action.
    #[must_use]
    pub fn chat_href(&self) -> String {
        phone::chat_href(self.phone.as_deref().unwrap_or_default())
    }
}

/// A validated donor about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDonor {
    pub name: String,
    pub group: BloodGroup,
    pub city: String,
    pub phone: Phone,
    pub last_donated: LastDonated,
    pub created_at: DateTime<Utc>,
}

impl NewDonor {
    /// Validate raw form input.
    ///
    /// `last_donated` may be blank, in which case it becomes `"N/A"`.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure, checking fields in form order.
    pub fn new(
        name: &str,
        group: &str,
        city: &str,
        phone: &str,
        last_donated: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DonorError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DonorError::MissingName);
        }
        let group: BloodGroup = group.trim().parse()?;
        let city = city.trim();
        if city.is_empty() {
            return Err(DonorError::MissingCity);
        }
        let phone = Phone::parse(phone)?;
        let last_donated = LastDonated::from_form(last_donated)?;
        if let LastDonated::Date(date) = last_donated {
            if date > latest_last_donated(created_at) {
                return Err(DonorError::LastDonatedInFuture);
            }
        }

        Ok(Self {
            name: name.to_owned(),
            group,
            city: city.to_owned(),
            phone,
            last_donated,
            created_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_new_donor_defaults_last_donated() {
        let donor = NewDonor::new("Asha", "B+", "Mumbai", "+911234567890", "  ", now()).unwrap();
        assert_eq!(donor.last_donated, LastDonated::NotAvailable);
        assert_eq!(donor.last_donated.to_stored(), "N/A");
        assert_eq!(donor.phone.as_str(), "+911234567890");
    }

    #[test]
    fn test_new_donor_with_date() {
        let donor = NewDonor::new("Asha", "O-", "Pune", "9876543210", "2025-12-01", now()).unwrap();
        assert_eq!(donor.last_donated.to_stored(), "2025-12-01");
    }

    #[test]
    fn test_new_donor_validation_order() {
        assert_eq!(
            NewDonor::new(" ", "B+", "", "", "", now()),
            Err(DonorError::MissingName)
        );
        assert!(matches!(
            NewDonor::new("Asha", "Z+", "Pune", "9876543210", "", now()),
            Err(DonorError::InvalidGroup(_))
        ));
        assert_eq!(
            NewDonor::new("Asha", "A+", " ", "9876543210", "", now()),
            Err(DonorError::MissingCity)
        );
        assert!(matches!(
            NewDonor::new("Asha", "A+", "Pune", "call me", "", now()),
            Err(DonorError::InvalidPhone(_))
        ));
        assert!(matches!(
            NewDonor::new("Asha", "A+", "Pune", "9876543210", "last week", now()),
            Err(DonorError::InvalidLastDonated(_))
        ));
        assert_eq!(
            NewDonor::new("Asha", "A+", "Pune", "9876543210", "2026-03-16", now()),
            Err(DonorError::LastDonatedInFuture)
        );
    }

    #[test]
    fn test_last_donated_from_stored() {
        assert_eq!(LastDonated::from_stored(None), LastDonated::NotAvailable);
        assert_eq!(LastDonated::from_stored(Some("N/A")), LastDonated::NotAvailable);
        assert_eq!(
            LastDonated::from_stored(Some("2024-01-31")),
            LastDonated::Date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
        );
        assert_eq!(
            LastDonated::from_stored(Some("Jan 2024")),
            LastDonated::Other("Jan 2024".to_owned())
        );
    }

    #[test]
    fn test_local_today_ahead_of_utc_is_accepted() {
        // 01:00 on 15 March in India is still 14 March in UTC.
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 19, 30, 0).unwrap();
        let donor = NewDonor::new("Ravi", "AB+", "Delhi", "+91 99999 88888", "2026-03-15", now)
            .unwrap();
        assert_eq!(donor.last_donated.to_stored(), "2026-03-15");
        assert_eq!(donor.created_at, now);
        assert_eq!(
            latest_last_donated(now),
            NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
        );
    }

    #[test]
    fn test_missing_fields_read_as_empty() {
        let donor = Donor {
            id: DonorId::parse("x").unwrap(),
            name: None,
            group: Some("Bombay".to_owned()),
            city: None,
            phone: None,
            last_donated: LastDonated::NotAvailable,
            created_at: None,
        };
        assert_eq!(donor.name_or_empty(), "");
        assert_eq!(donor.city_or_empty(), "");
        assert_eq!(donor.group_or_empty(), "Bombay");
        assert_eq!(donor.chat_href(), "https://wa.me/");
    }
}
