use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A user's declarative notification preferences, as read from the
/// settings API. Mutated only by the preference owner, never by this
/// engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationProfile {
    pub user_id: String,
    pub enabled: bool,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub meal_times: MealTimes,
    #[serde(default)]
    pub weight: TimedToggle,
    #[serde(default)]
    pub sleep: TimedToggle,
    #[serde(default)]
    pub motivation: TimedToggle,
    #[serde(default)]
    pub water: WaterReminder,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl NotificationProfile {
    /// Whether a reminder kind is active for this profile. Meal reminders
    /// ride the master switch alone; the others have their own toggle.
    pub fn kind_enabled(&self, kind: ReminderKind) -> bool {
        if !self.enabled {
            return false;
        }
        match kind {
            ReminderKind::Breakfast | ReminderKind::Lunch | ReminderKind::Dinner => true,
            ReminderKind::Weight => self.weight.enabled,
            ReminderKind::Sleep => self.sleep.enabled,
            ReminderKind::Motivation => self.motivation.enabled,
            ReminderKind::Water => self.water.enabled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealTimes {
    pub breakfast: String,
    pub lunch: String,
    pub dinner: String,
}

impl Default for MealTimes {
    fn default() -> Self {
        MealTimes {
            breakfast: "08:00".to_string(),
            lunch: "13:00".to_string(),
            dinner: "19:00".to_string(),
        }
    }
}

/// A single daily reminder with an on/off switch and a local HH:MM time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedToggle {
    pub enabled: bool,
    pub time: String,
}

impl Default for TimedToggle {
    fn default() -> Self {
        TimedToggle {
            enabled: false,
            time: "20:00".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterReminder {
    pub enabled: bool,
    #[serde(default)]
    pub interval: WaterInterval,
    #[serde(default = "default_window_start")]
    pub window_start: String,
    #[serde(default = "default_window_end")]
    pub window_end: String,
}

fn default_window_start() -> String {
    "08:00".to_string()
}

fn default_window_end() -> String {
    "22:00".to_string()
}

impl Default for WaterReminder {
    fn default() -> Self {
        WaterReminder {
            enabled: false,
            interval: WaterInterval::default(),
            window_start: default_window_start(),
            window_end: default_window_end(),
        }
    }
}

/// Allowed water-reminder intervals, serialized as the fractional hour
/// value the settings UI offers (1, 1.5, 2, 2.5, 3, 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum WaterInterval {
    OneHour,
    NinetyMinutes,
    TwoHours,
    TwoAndAHalfHours,
    ThreeHours,
    FourHours,
}

impl Default for WaterInterval {
    fn default() -> Self {
        WaterInterval::TwoHours
    }
}

impl WaterInterval {
    pub fn minutes(self) -> u32 {
        match self {
            WaterInterval::OneHour => 60,
            WaterInterval::NinetyMinutes => 90,
            WaterInterval::TwoHours => 120,
            WaterInterval::TwoAndAHalfHours => 150,
            WaterInterval::ThreeHours => 180,
            WaterInterval::FourHours => 240,
        }
    }
}

impl TryFrom<f64> for WaterInterval {
    type Error = String;

    fn try_from(hours: f64) -> Result<Self, Self::Error> {
        match (hours * 60.0).round() as u32 {
            60 => Ok(WaterInterval::OneHour),
            90 => Ok(WaterInterval::NinetyMinutes),
            120 => Ok(WaterInterval::TwoHours),
            150 => Ok(WaterInterval::TwoAndAHalfHours),
            180 => Ok(WaterInterval::ThreeHours),
            240 => Ok(WaterInterval::FourHours),
            _ => Err(format!("unsupported water interval: {} hours", hours)),
        }
    }
}

impl From<WaterInterval> for f64 {
    fn from(interval: WaterInterval) -> f64 {
        interval.minutes() as f64 / 60.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderKind {
    Breakfast,
    Lunch,
    Dinner,
    Weight,
    Sleep,
    Motivation,
    Water,
}

impl ReminderKind {
    pub const ALL: [ReminderKind; 7] = [
        ReminderKind::Breakfast,
        ReminderKind::Lunch,
        ReminderKind::Dinner,
        ReminderKind::Weight,
        ReminderKind::Sleep,
        ReminderKind::Motivation,
        ReminderKind::Water,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderKind::Breakfast => "breakfast",
            ReminderKind::Lunch => "lunch",
            ReminderKind::Dinner => "dinner",
            ReminderKind::Weight => "weight",
            ReminderKind::Sleep => "sleep",
            ReminderKind::Motivation => "motivation",
            ReminderKind::Water => "water",
        }
    }
}

impl fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "breakfast" => Ok(ReminderKind::Breakfast),
            "lunch" => Ok(ReminderKind::Lunch),
            "dinner" => Ok(ReminderKind::Dinner),
            "weight" => Ok(ReminderKind::Weight),
            "sleep" => Ok(ReminderKind::Sleep),
            "motivation" => Ok(ReminderKind::Motivation),
            "water" => Ok(ReminderKind::Water),
            _ => Err(format!("unknown reminder kind: {}", s)),
        }
    }
}

/// When a compiled trigger fires, in UTC. Water reminders carry the full
/// set of firing times covering the converted window; everything else is
/// a single daily time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum Schedule {
    Daily { hour: u8, minute: u8 },
    Recurring { times: Vec<(u8, u8)> },
}

impl Schedule {
    pub fn fires_at(&self, hour: u8, minute: u8) -> bool {
        match self {
            Schedule::Daily { hour: h, minute: m } => *h == hour && *m == minute,
            Schedule::Recurring { times } => times.iter().any(|&(h, m)| h == hour && m == minute),
        }
    }

    /// Number of firings per day.
    pub fn firing_count(&self) -> usize {
        match self {
            Schedule::Daily { .. } => 1,
            Schedule::Recurring { times } => times.len(),
        }
    }
}

/// Derived, never persisted. Identity key is `(user_id, kind)`; arming a
/// trigger with an existing identity replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledTrigger {
    pub user_id: String,
    pub kind: ReminderKind,
    pub schedule: Schedule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointState {
    Active,
    Removed,
}

/// Opaque key material required by the push protocol; passed through to
/// the delivery transport untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushCrypto {
    pub p256dh: String,
    pub auth: String,
}

/// One live push endpoint per user; a new subscribe overwrites the
/// previous one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEndpoint {
    pub user_id: String,
    pub transport_address: String,
    pub crypto: PushCrypto,
    #[serde(default = "default_endpoint_state")]
    pub state: EndpointState,
}

fn default_endpoint_state() -> EndpointState {
    EndpointState::Active
}

/// What the snapshot loader hands the reconciler: one row per user with
/// notifications enabled or a stored endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub profile: NotificationProfile,
    pub endpoint: Option<PushEndpoint>,
}

/// Classified result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    TransientFailure { status: Option<u16> },
    PermanentFailure { status: u16, reason: &'static str },
}

/// Result of one dispatch, as reported to callers and the status book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchResult {
    Delivered,
    Disabled,
    NoEndpoint,
    Failure,
}

impl DispatchResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchResult::Delivered => "delivered",
            DispatchResult::Disabled => "disabled",
            DispatchResult::NoEndpoint => "no_endpoint",
            DispatchResult::Failure => "failure",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub result: DispatchResult,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn water_interval_round_trips_through_fractional_hours() {
        for interval in [
            WaterInterval::OneHour,
            WaterInterval::NinetyMinutes,
            WaterInterval::TwoHours,
            WaterInterval::TwoAndAHalfHours,
            WaterInterval::ThreeHours,
            WaterInterval::FourHours,
        ] {
            let hours: f64 = interval.into();
            assert_eq!(WaterInterval::try_from(hours).unwrap(), interval);
        }
    }

    #[test]
    fn water_interval_rejects_unsupported_values() {
        assert!(WaterInterval::try_from(0.5).is_err());
        assert!(WaterInterval::try_from(5.0).is_err());
    }

    #[test]
    fn reminder_kind_string_round_trip() {
        for kind in ReminderKind::ALL {
            assert_eq!(kind.as_str().parse::<ReminderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn profile_deserializes_with_defaults() {
        let profile: NotificationProfile =
            serde_json::from_str(r#"{"user_id":"u1","enabled":true}"#).unwrap();
        assert_eq!(profile.timezone, "UTC");
        assert_eq!(profile.meal_times.breakfast, "08:00");
        assert_eq!(profile.water.window_end, "22:00");
        assert!(!profile.water.enabled);
    }
}
