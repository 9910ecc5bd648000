//! Génération déterministe des shifts virtuels d'une rotation.
//!
//! Rien n'est persisté ici : le planning est recalculé à chaque requête à
//! partir du début de la rotation, de la durée d'un shift et de l'ordre des
//! participants.

mod util;

use crate::model::{Participant, Rotation, Shift, Timeframe};
use chrono::{DateTime, Utc};

/// Générateur lié à un instantané immuable de la rotation.
#[derive(Debug, Clone)]
pub struct ShiftGenerator<'a> {
    rotation: &'a Rotation,
    participants: Vec<&'a Participant>,
}

impl<'a> ShiftGenerator<'a> {
    pub fn new(rotation: &'a Rotation) -> Self {
        Self {
            rotation,
            participants: rotation.color_ordered_participants(),
        }
    }

    /// Shift couvrant l'instant `timestamp`, ou `None` si la rotation n'a pas
    /// encore commencé ou n'a aucun participant.
    pub fn for_timestamp(&self, timestamp: DateTime<Utc>) -> Option<Shift> {
        if timestamp < self.rotation.starts_at() || self.participants.is_empty() {
            return None;
        }
        let count = self.elapsed_whole_shifts(timestamp);
        let starts_at = self.shift_starts_at(count)?;
        self.shift_for(count, starts_at)
    }

    /// Shifts couvrant `[starts_at, ends_at)`, triés par début.
    ///
    /// Le premier shift peut commencer avant `starts_at` et le dernier finir
    /// après `ends_at` : les bornes des shifts ne sont jamais tronquées.
    pub fn for_timeframe(&self, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Vec<Shift> {
        let starts_at = starts_at.max(self.rotation.starts_at());
        if starts_at >= ends_at || self.participants.is_empty() {
            return Vec::new();
        }

        let mut shift_count = self.elapsed_whole_shifts(starts_at);
        let Some(mut shift_starts_at) = self.shift_starts_at(shift_count) else {
            return Vec::new();
        };

        let mut shifts = Vec::new();
        while shift_starts_at < ends_at {
            let Some(shift) = self.shift_for(shift_count, shift_starts_at) else {
                break;
            };
            shift_starts_at = shift.ends_at;
            shift_count += 1;
            shifts.push(shift);
        }
        shifts
    }

    pub fn for_window(&self, window: Timeframe) -> Vec<Shift> {
        self.for_timeframe(window.starts_at, window.ends_at)
    }

    fn elapsed_whole_shifts(&self, at: DateTime<Utc>) -> i64 {
        util::elapsed_shift_count(self.rotation.starts_at(), at, self.rotation.shift_duration())
    }

    fn shift_starts_at(&self, count: i64) -> Option<DateTime<Utc>> {
        util::shift_start_time(self.rotation.starts_at(), count, self.rotation.shift_duration())
    }

    fn shift_for(&self, count: i64, starts_at: DateTime<Utc>) -> Option<Shift> {
        let participant = self.participants[util::participant_rank(count, self.participants.len())];
        let ends_at = starts_at.checked_add_signed(self.rotation.shift_duration())?;
        Some(Shift::unsaved(
            self.rotation.id().clone(),
            participant.id.clone(),
            starts_at,
            ends_at,
        ))
    }
}

/// Shift virtuel couvrant `timestamp`.
pub fn generate_shift_covering(rotation: &Rotation, timestamp: DateTime<Utc>) -> Option<Shift> {
    ShiftGenerator::new(rotation).for_timestamp(timestamp)
}

/// Planning virtuel sur `[starts_at, ends_at)`.
pub fn generate_shifts_for_window(
    rotation: &Rotation,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> Vec<Shift> {
    ShiftGenerator::new(rotation).for_timeframe(starts_at, ends_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColorPalette, ColorWeight, ParticipantId, ShiftLengthUnit};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 12, 8, 0, 0, 0).unwrap()
    }

    fn rotation(handles: &[&str]) -> Rotation {
        let mut r = Rotation::new("primary", t0(), 1, ShiftLengthUnit::Days).unwrap();
        for (i, handle) in handles.iter().enumerate() {
            let weight = ColorWeight::try_from(ColorWeight::ALLOWED[i]).unwrap();
            r.add_participant(Participant::new(*handle, *handle, ColorPalette::Blue, weight))
                .unwrap();
        }
        r
    }

    fn handles<'r>(r: &'r Rotation, shifts: &[Shift]) -> Vec<&'r str> {
        shifts
            .iter()
            .map(|s| r.find_participant(&s.participant).unwrap().handle.as_str())
            .collect()
    }

    #[test]
    fn consecutive_shifts_are_contiguous() {
        let r = rotation(&["a", "b", "c"]);
        let d = r.shift_duration();
        let shifts = generate_shifts_for_window(&r, t0(), t0() + d * 10);
        assert_eq!(shifts.len(), 10);
        for pair in shifts.windows(2) {
            assert_eq!(pair[0].ends_at, pair[1].starts_at);
        }
        assert!(shifts.iter().all(|s| s.ends_at - s.starts_at == d));
        assert!(shifts.iter().all(|s| !s.is_persisted()));
    }

    #[test]
    fn participants_follow_global_phase() {
        let r = rotation(&["a", "b", "c"]);
        let d = r.shift_duration();
        let shifts = generate_shifts_for_window(&r, t0() + d, t0() + d * 3);
        assert_eq!(handles(&r, &shifts), ["b", "c"]);
    }

    #[test]
    fn window_before_rotation_start_is_clamped() {
        let r = rotation(&["a", "b", "c"]);
        let d = r.shift_duration();
        let early = generate_shifts_for_window(&r, t0() - Duration::days(1), t0() + d);
        let exact = generate_shifts_for_window(&r, t0(), t0() + d);
        assert_eq!(early, exact);
        assert_eq!(early[0].starts_at, t0());
    }

    #[test]
    fn degenerate_windows_are_empty() {
        let r = rotation(&["a", "b", "c"]);
        let d = r.shift_duration();
        assert!(generate_shifts_for_window(&r, t0(), t0()).is_empty());
        assert!(generate_shifts_for_window(&r, t0() + d * 5, t0() + d * 2).is_empty());
        assert!(generate_shifts_for_window(&r, t0() - d * 3, t0()).is_empty());
    }

    #[test]
    fn no_participants_means_no_shifts() {
        let r = rotation(&[]);
        let d = r.shift_duration();
        assert!(generate_shifts_for_window(&r, t0(), t0() + d * 4).is_empty());
        assert!(generate_shift_covering(&r, t0()).is_none());
    }

    #[test]
    fn window_inside_a_shift_keeps_full_boundaries() {
        let r = rotation(&["a", "b", "c"]);
        let d = r.shift_duration();
        let shifts = generate_shifts_for_window(&r, t0() + d / 2, t0() + d * 3 / 2);
        let intervals: Vec<_> = shifts.iter().map(Shift::interval).collect();
        assert_eq!(intervals, [(t0(), t0() + d), (t0() + d, t0() + d * 2)]);
    }

    #[test]
    fn single_participant_takes_every_shift() {
        let r = rotation(&["solo"]);
        let d = r.shift_duration();
        let shifts = generate_shifts_for_window(&r, t0(), t0() + d * 4);
        assert_eq!(handles(&r, &shifts), ["solo"; 4]);
    }

    #[test]
    fn covering_shift_matches_window_generation() {
        let r = rotation(&["a", "b", "c"]);
        let d = r.shift_duration();
        let at = t0() + d * 4 + Duration::hours(3);
        let shift = generate_shift_covering(&r, at).unwrap();
        assert_eq!(shift.starts_at, t0() + d * 4);
        assert_eq!(shift.ends_at, t0() + d * 5);
        assert!(shift.covers(at));
        assert_eq!(handles(&r, std::slice::from_ref(&shift)), ["b"]);

        let from_window = generate_shifts_for_window(&r, at, at + Duration::minutes(1));
        assert_eq!(from_window, vec![shift]);
    }

    #[test]
    fn covering_shift_before_start_is_none() {
        let r = rotation(&["a"]);
        assert!(generate_shift_covering(&r, t0() - Duration::seconds(1)).is_none());
        assert!(generate_shift_covering(&r, t0()).is_some());
    }

    #[test]
    fn generation_is_repeatable() {
        let r = rotation(&["a", "b", "c"]);
        let d = r.shift_duration();
        let gen = ShiftGenerator::new(&r);
        let window = Timeframe::new(t0() + d / 3, t0() + d * 9);
        assert_eq!(gen.for_window(window), gen.for_window(window));
    }

    #[test]
    fn unknown_participant_never_appears() {
        let r = rotation(&["a", "b"]);
        let d = r.shift_duration();
        let stranger = ParticipantId::new("nobody");
        let shifts = generate_shifts_for_window(&r, t0(), t0() + d * 6);
        assert!(shifts.iter().all(|s| s.participant != stranger));
        assert!(shifts.iter().all(|s| &s.rotation_id == r.id()));
    }
}
