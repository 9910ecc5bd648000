use chrono::{DateTime, Duration, Utc};

/// Nombre de shifts complets écoulés entre `anchor` et `at`.
///
/// Calcul entier en millisecondes : les durées de shift sont des heures
/// entières, la division tombe donc exactement sur les bornes.
pub(super) fn elapsed_shift_count(
    anchor: DateTime<Utc>,
    at: DateTime<Utc>,
    shift_duration: Duration,
) -> i64 {
    let elapsed = (at - anchor).num_milliseconds();
    let step = shift_duration.num_milliseconds();
    elapsed.div_euclid(step)
}

/// Début du `count`-ième shift compté depuis `anchor`.
pub(super) fn shift_start_time(
    anchor: DateTime<Utc>,
    count: i64,
    shift_duration: Duration,
) -> Option<DateTime<Utc>> {
    let offset = count.checked_mul(shift_duration.num_milliseconds())?;
    anchor.checked_add_signed(Duration::try_milliseconds(offset)?)
}

/// Position dans la liste ordonnée des participants.
pub(super) fn participant_rank(count: i64, total: usize) -> usize {
    count.rem_euclid(total as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn exact_boundary_starts_a_new_shift() {
        let t0 = Utc.with_ymd_and_hms(2020, 12, 8, 0, 0, 0).unwrap();
        let d = Duration::days(5);
        assert_eq!(elapsed_shift_count(t0, t0, d), 0);
        assert_eq!(elapsed_shift_count(t0, t0 + d - Duration::milliseconds(1), d), 0);
        assert_eq!(elapsed_shift_count(t0, t0 + d, d), 1);
        assert_eq!(elapsed_shift_count(t0, t0 + d * 7, d), 7);
    }

    #[test]
    fn odd_fraction_floors() {
        let t0 = Utc.with_ymd_and_hms(2020, 12, 8, 0, 0, 0).unwrap();
        let d = Duration::days(5);
        // 2.7 shifts
        let at = t0 + Duration::hours(324);
        assert_eq!(elapsed_shift_count(t0, at, d), 2);
        assert_eq!(shift_start_time(t0, 2, d), Some(t0 + Duration::days(10)));
    }

    #[test]
    fn sub_millisecond_offsets_do_not_cross_a_boundary() {
        let t0 = Utc.with_ymd_and_hms(2020, 12, 8, 0, 0, 0).unwrap();
        let d = Duration::hours(1);
        let at = t0 + d - Duration::microseconds(1);
        assert_eq!(elapsed_shift_count(t0, at, d), 0);
    }

    #[test]
    fn rank_wraps_around() {
        assert_eq!(participant_rank(0, 3), 0);
        assert_eq!(participant_rank(4, 3), 1);
        assert_eq!(participant_rank(21, 3), 0);
    }
}
