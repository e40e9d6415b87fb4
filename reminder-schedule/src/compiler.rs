use chrono::{NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use reminder_core::error::CompileError;
use reminder_core::types::{
    CompiledTrigger, NotificationProfile, ReminderKind, Schedule, WaterReminder,
};
use tracing;

/// Compile a profile into the full set of triggers it implies. Pure: no
/// I/O, deterministic for a given profile (zone offsets are resolved as
/// of compile time; the hourly reconciliation pass re-runs this, which
/// absorbs DST transitions within an hour).
///
/// A malformed time string skips that single reminder with a warning and
/// never aborts compilation of the user's other reminders.
pub fn compile(profile: &NotificationProfile, fallback_zone: &str) -> Vec<CompiledTrigger> {
    if !profile.enabled {
        return Vec::new();
    }

    let tz = resolve_zone(&profile.timezone, fallback_zone);
    let mut triggers = Vec::new();

    let daily: [(ReminderKind, bool, &str); 6] = [
        (ReminderKind::Breakfast, true, &profile.meal_times.breakfast),
        (ReminderKind::Lunch, true, &profile.meal_times.lunch),
        (ReminderKind::Dinner, true, &profile.meal_times.dinner),
        (ReminderKind::Weight, profile.weight.enabled, &profile.weight.time),
        (ReminderKind::Sleep, profile.sleep.enabled, &profile.sleep.time),
        (
            ReminderKind::Motivation,
            profile.motivation.enabled,
            &profile.motivation.time,
        ),
    ];

    for (kind, enabled, local_time) in daily {
        if !enabled {
            continue;
        }
        match compile_daily(tz, local_time) {
            Ok((hour, minute)) => triggers.push(CompiledTrigger {
                user_id: profile.user_id.clone(),
                kind,
                schedule: Schedule::Daily { hour, minute },
            }),
            Err(e) => {
                tracing::warn!(
                    "Skipping {} reminder for user {}: {}",
                    kind,
                    profile.user_id,
                    e
                );
            }
        }
    }

    if profile.water.enabled {
        match compile_water(tz, &profile.water) {
            Ok(schedule) => triggers.push(CompiledTrigger {
                user_id: profile.user_id.clone(),
                kind: ReminderKind::Water,
                schedule,
            }),
            Err(e) => {
                tracing::warn!("Skipping water reminder for user {}: {}", profile.user_id, e);
            }
        }
    }

    triggers
}

fn resolve_zone(name: &str, fallback: &str) -> Tz {
    name.parse().unwrap_or_else(|_| {
        tracing::warn!("Unknown timezone {:?}, falling back to {:?}", name, fallback);
        fallback.parse().unwrap_or(chrono_tz::UTC)
    })
}

fn parse_local_time(raw: &str) -> Result<NaiveTime, CompileError> {
    let (hour, minute) = raw
        .split_once(':')
        .ok_or_else(|| CompileError::InvalidTime(raw.to_string()))?;
    let hour: u32 = hour
        .parse()
        .map_err(|_| CompileError::InvalidTime(raw.to_string()))?;
    let minute: u32 = minute
        .parse()
        .map_err(|_| CompileError::InvalidTime(raw.to_string()))?;
    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| CompileError::InvalidTime(raw.to_string()))
}

/// Resolve a local wall-clock time in `tz` to the UTC (hour, minute) the
/// scheduler fires on. Conversions that cross midnight wrap cleanly;
/// 00:15 at UTC+05:30 compiles to 18:45.
fn local_to_utc(tz: Tz, time: NaiveTime) -> Result<(u8, u8), CompileError> {
    let today = Utc::now().with_timezone(&tz).date_naive();
    let local = today.and_time(time);

    // A DST gap can make the wall-clock time nonexistent; sliding one
    // hour forward lands on the other side of the gap.
    let resolved = tz
        .from_local_datetime(&local)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(local + chrono::Duration::hours(1)))
                .earliest()
        })
        .ok_or_else(|| {
            CompileError::UnrepresentableLocalTime(time.format("%H:%M").to_string(), tz.to_string())
        })?;

    let utc = resolved.with_timezone(&Utc);
    Ok((utc.hour() as u8, utc.minute() as u8))
}

fn compile_daily(tz: Tz, local_time: &str) -> Result<(u8, u8), CompileError> {
    local_to_utc(tz, parse_local_time(local_time)?)
}

/// Expand the water window into concrete UTC firing times: every
/// `interval` from `window_start` through `window_end`, measured in local
/// minutes-of-day. A window spanning midnight (start > end) is measured
/// modulo 24h, and each firing time is converted to UTC independently, so
/// a window that wraps only after conversion still comes out bounded and
/// non-empty.
fn compile_water(tz: Tz, water: &WaterReminder) -> Result<Schedule, CompileError> {
    let start = parse_local_time(&water.window_start)?;
    let end = parse_local_time(&water.window_end)?;

    let start_min = start.hour() * 60 + start.minute();
    let end_min = end.hour() * 60 + end.minute();
    let span = (end_min + 1440 - start_min) % 1440;
    let step = water.interval.minutes();

    let mut times = Vec::new();
    let mut offset = 0;
    while offset <= span {
        let local_min = (start_min + offset) % 1440;
        let time = NaiveTime::from_hms_opt(local_min / 60, local_min % 60, 0)
            .ok_or_else(|| CompileError::InvalidTime(water.window_start.clone()))?;
        times.push(local_to_utc(tz, time)?);
        offset += step;
    }

    Ok(Schedule::Recurring { times })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reminder_core::types::{MealTimes, TimedToggle, WaterInterval};

    fn profile(user_id: &str, timezone: &str) -> NotificationProfile {
        NotificationProfile {
            user_id: user_id.to_string(),
            enabled: true,
            timezone: timezone.to_string(),
            meal_times: MealTimes::default(),
            weight: TimedToggle::default(),
            sleep: TimedToggle::default(),
            motivation: TimedToggle::default(),
            water: WaterReminder::default(),
        }
    }

    fn find(triggers: &[CompiledTrigger], kind: ReminderKind) -> &CompiledTrigger {
        triggers.iter().find(|t| t.kind == kind).unwrap()
    }

    #[test]
    fn disabled_profile_compiles_to_nothing() {
        let mut p = profile("u1", "Asia/Kolkata");
        p.enabled = false;
        p.water.enabled = true;
        assert!(compile(&p, "UTC").is_empty());
    }

    #[test]
    fn compilation_is_deterministic() {
        let mut p = profile("u1", "Asia/Kolkata");
        p.water.enabled = true;
        p.sleep.enabled = true;
        assert_eq!(compile(&p, "UTC"), compile(&p, "UTC"));
    }

    #[test]
    fn kolkata_breakfast_converts_to_utc_with_half_hour_offset() {
        // Asia/Kolkata is UTC+05:30 year-round.
        let mut p = profile("u1", "Asia/Kolkata");
        p.meal_times.breakfast = "08:00".to_string();
        let triggers = compile(&p, "UTC");
        assert_eq!(
            find(&triggers, ReminderKind::Breakfast).schedule,
            Schedule::Daily { hour: 2, minute: 30 }
        );
    }

    #[test]
    fn conversion_crossing_midnight_wraps_hour_and_minute() {
        // 00:15 local at +05:30 is 18:45 UTC the previous day.
        let mut p = profile("u1", "Asia/Kolkata");
        p.meal_times.breakfast = "00:15".to_string();
        let triggers = compile(&p, "UTC");
        assert_eq!(
            find(&triggers, ReminderKind::Breakfast).schedule,
            Schedule::Daily { hour: 18, minute: 45 }
        );
    }

    #[test]
    fn water_window_expands_to_interval_firings() {
        // 08:00-22:00 local every 2h is 8 firings: 08,10,...,22.
        let mut p = profile("u1", "Asia/Kolkata");
        p.water.enabled = true;
        p.water.interval = WaterInterval::TwoHours;
        let triggers = compile(&p, "UTC");
        let water = find(&triggers, ReminderKind::Water);
        match &water.schedule {
            Schedule::Recurring { times } => {
                assert_eq!(times.len(), 8);
                assert_eq!(times[0], (2, 30));
                assert_eq!(times[7], (16, 30));
            }
            other => panic!("expected recurring schedule, got {:?}", other),
        }
    }

    #[test]
    fn water_window_crossing_midnight_stays_bounded() {
        let mut p = profile("u1", "Asia/Kolkata");
        p.water.enabled = true;
        p.water.interval = WaterInterval::TwoHours;
        p.water.window_start = "23:00".to_string();
        p.water.window_end = "03:00".to_string();
        let triggers = compile(&p, "UTC");
        let water = find(&triggers, ReminderKind::Water);
        match &water.schedule {
            Schedule::Recurring { times } => {
                // 23:00, 01:00, 03:00 local -> 17:30, 19:30, 21:30 UTC.
                assert_eq!(times, &vec![(17, 30), (19, 30), (21, 30)]);
            }
            other => panic!("expected recurring schedule, got {:?}", other),
        }
    }

    #[test]
    fn malformed_time_skips_only_that_reminder() {
        let mut p = profile("u1", "UTC");
        p.meal_times.lunch = "25:99".to_string();
        p.sleep = TimedToggle {
            enabled: true,
            time: "not-a-time".to_string(),
        };
        let triggers = compile(&p, "UTC");
        assert!(triggers.iter().all(|t| t.kind != ReminderKind::Lunch));
        assert!(triggers.iter().all(|t| t.kind != ReminderKind::Sleep));
        // Breakfast and dinner still compiled.
        assert!(triggers.iter().any(|t| t.kind == ReminderKind::Breakfast));
        assert!(triggers.iter().any(|t| t.kind == ReminderKind::Dinner));
    }

    #[test]
    fn unknown_timezone_falls_back() {
        let mut p = profile("u1", "Not/AZone");
        p.meal_times.breakfast = "08:00".to_string();
        let triggers = compile(&p, "UTC");
        assert_eq!(
            find(&triggers, ReminderKind::Breakfast).schedule,
            Schedule::Daily { hour: 8, minute: 0 }
        );
    }

    #[test]
    fn toggled_reminders_compile_only_when_enabled() {
        let mut p = profile("u1", "UTC");
        p.weight = TimedToggle {
            enabled: true,
            time: "07:30".to_string(),
        };
        let triggers = compile(&p, "UTC");
        assert!(triggers.iter().any(|t| t.kind == ReminderKind::Weight));
        assert!(triggers.iter().all(|t| t.kind != ReminderKind::Sleep));
        assert!(triggers.iter().all(|t| t.kind != ReminderKind::Motivation));
        assert!(triggers.iter().all(|t| t.kind != ReminderKind::Water));
    }
}
