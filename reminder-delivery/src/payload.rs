use rand::Rng;
use reminder_core::types::ReminderKind;
use serde::Serialize;
use uuid::Uuid;

/// Wire payload for one push notification.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub body: String,
}

const QUOTES: &[&str] = &[
    "Small steps every day add up to big results.",
    "You don't have to be extreme, just consistent.",
    "The secret of getting ahead is getting started.",
    "Take care of your body. It's the only place you have to live.",
    "Discipline is choosing between what you want now and what you want most.",
    "A year from now you may wish you had started today.",
    "Progress, not perfection.",
    "Your future self is watching you right now through memories.",
];

/// Pick one motivational quote. Pure in the Rng, so callers can seed it;
/// selection happens at dispatch time, never at compile time.
pub fn pick_quote<R: Rng>(rng: &mut R) -> &'static str {
    QUOTES[rng.gen_range(0..QUOTES.len())]
}

pub fn build<R: Rng>(kind: ReminderKind, rng: &mut R) -> NotificationPayload {
    let (title, body) = match kind {
        ReminderKind::Breakfast => ("Breakfast time", "Time for breakfast. Don't forget to log it!"),
        ReminderKind::Lunch => ("Lunch time", "Time for lunch. Don't forget to log it!"),
        ReminderKind::Dinner => ("Dinner time", "Time for dinner. Don't forget to log it!"),
        ReminderKind::Weight => ("Weigh-in reminder", "Step on the scale and log today's weight."),
        ReminderKind::Sleep => ("Bedtime reminder", "Time to wind down. Log last night's sleep if you haven't."),
        ReminderKind::Motivation => ("Daily motivation", pick_quote(rng)),
        ReminderKind::Water => ("Hydration break", "Time to drink a glass of water."),
    };

    NotificationPayload {
        id: Uuid::new_v4().to_string(),
        kind: kind.as_str().to_string(),
        title: title.to_string(),
        body: body.to_string(),
    }
}

/// Ad-hoc payload for the immediate-test path, outside any schedule.
pub fn build_test() -> NotificationPayload {
    NotificationPayload {
        id: Uuid::new_v4().to_string(),
        kind: "test".to_string(),
        title: "Test notification".to_string(),
        body: "Push notifications are working.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn quote_selection_is_deterministic_for_a_seeded_rng() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        for _ in 0..16 {
            assert_eq!(pick_quote(&mut a), pick_quote(&mut b));
        }
    }

    #[test]
    fn motivation_payload_body_is_a_known_quote() {
        let mut rng = StdRng::seed_from_u64(1);
        let payload = build(ReminderKind::Motivation, &mut rng);
        assert!(QUOTES.contains(&payload.body.as_str()));
        assert_eq!(payload.kind, "motivation");
    }

    #[test]
    fn each_kind_builds_a_titled_payload() {
        let mut rng = StdRng::seed_from_u64(1);
        for kind in ReminderKind::ALL {
            let payload = build(kind, &mut rng);
            assert!(!payload.title.is_empty());
            assert!(!payload.body.is_empty());
            assert_eq!(payload.kind, kind.as_str());
        }
    }
}
