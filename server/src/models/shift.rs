use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Fixed lesson bands. Every lesson is 90 minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum TimeSlot {
    #[serde(rename = "10:00-11:30")]
    #[sqlx(rename = "10:00-11:30")]
    Morning,
    #[serde(rename = "11:40-13:10")]
    #[sqlx(rename = "11:40-13:10")]
    Midday,
    #[serde(rename = "14:00-15:30")]
    #[sqlx(rename = "14:00-15:30")]
    Afternoon,
    #[serde(rename = "16:00-17:30")]
    #[sqlx(rename = "16:00-17:30")]
    AfterSchool,
    #[serde(rename = "17:40-19:10")]
    #[sqlx(rename = "17:40-19:10")]
    Evening,
    #[serde(rename = "19:20-20:50")]
    #[sqlx(rename = "19:20-20:50")]
    Night,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 6] = [
        TimeSlot::Morning,
        TimeSlot::Midday,
        TimeSlot::Afternoon,
        TimeSlot::AfterSchool,
        TimeSlot::Evening,
        TimeSlot::Night,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TimeSlot::Morning => "10:00-11:30",
            TimeSlot::Midday => "11:40-13:10",
            TimeSlot::Afternoon => "14:00-15:30",
            TimeSlot::AfterSchool => "16:00-17:30",
            TimeSlot::Evening => "17:40-19:10",
            TimeSlot::Night => "19:20-20:50",
        }
    }

    /// Local wall-clock start of the band.
    pub fn start_time(&self) -> NaiveTime {
        let (h, m) = match self {
            TimeSlot::Morning => (10, 0),
            TimeSlot::Midday => (11, 40),
            TimeSlot::Afternoon => (14, 0),
            TimeSlot::AfterSchool => (16, 0),
            TimeSlot::Evening => (17, 40),
            TimeSlot::Night => (19, 20),
        };
        NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default()
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTimeSlot(pub String);

impl fmt::Display for UnknownTimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown time slot '{}'", self.0)
    }
}

impl FromStr for TimeSlot {
    type Err = UnknownTimeSlot;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        TimeSlot::ALL
            .into_iter()
            .find(|slot| slot.label() == trimmed)
            .ok_or_else(|| UnknownTimeSlot(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: Uuid,
    pub tutor_id: Uuid,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub is_available: bool,
    /// Booking currently holding this shift. Written only inside booking transactions.
    pub consumed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shift {
    pub fn new(
        tutor_id: Uuid,
        date: NaiveDate,
        time_slot: TimeSlot,
        is_available: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tutor_id,
            date,
            time_slot,
            is_available,
            consumed_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed_by.is_some()
    }

    pub fn is_open(&self) -> bool {
        self.is_available && !self.is_consumed()
    }
}
