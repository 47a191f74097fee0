use std::fmt;

use serde::{Serialize, Serializer};
use ::time::{macros::format_description, OffsetDateTime};

/// Seconds since the unix epoch, UTC.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq)]
#[derive(sqlx::Type)]
#[sqlx(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc().unix_timestamp())
    }

    #[cfg(test)]
    pub fn from_i64(secs: i64) -> Self {
        Self(secs)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self(0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = OffsetDateTime::from_unix_timestamp(self.0)
            .ok()
            .and_then(|when| {
                when.format(format_description!(
                    "[month repr:long] [day padding:none], [year]"
                ))
                .ok()
            });

        match formatted {
            Some(s) => write!(fmt, "{}", s),
            None => write!(fmt, "{}", self.0),
        }
    }
}

// templates only ever want the human form
impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn displays_as_a_date() {
        assert_eq!(Timestamp::from_i64(1_700_000_000).to_string(), "November 14, 2023");
        assert_eq!(Timestamp::default().to_string(), "January 1, 1970");
    }

    #[test]
    fn out_of_range_falls_back_to_seconds() {
        assert_eq!(Timestamp::from_i64(i64::MAX).to_string(), i64::MAX.to_string());
    }

    #[test]
    fn now_is_after_the_epoch() {
        assert!(Timestamp::now() > Timestamp::default());
    }
}
