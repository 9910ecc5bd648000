//! Snapshot des shifts passés : fige en base les shifts virtuels déjà
//! commencés, pour que l'historique survive aux changements de participants.

use crate::generator::ShiftGenerator;
use crate::model::{RotationId, Shift, Timeframe};
use crate::storage::ShiftStore;
use anyhow::Context;
use chrono::{DateTime, Months, Utc};

/// Profondeur d'historique par défaut, en mois.
pub const DEFAULT_LOOKBACK_MONTHS: u32 = 6;

/// Persiste les shifts de `[now - lookback, now)` qui ne le sont pas encore.
///
/// Rotation inconnue : rien n'est écrit. Relancer le job n'insère rien de plus.
pub fn persist_shifts<S: ShiftStore + ?Sized>(
    store: &mut S,
    rotation_id: &RotationId,
    now: DateTime<Utc>,
    lookback: Months,
) -> anyhow::Result<usize> {
    let Some(rotation) = store.find_rotation(rotation_id)? else {
        return Ok(0);
    };

    let starts_at = now
        .checked_sub_months(lookback)
        .context("lookback before the supported date range")?;
    let window = Timeframe::new(starts_at, now);

    let existing = store.find_persisted_shifts(rotation_id, window)?;
    let to_persist: Vec<Shift> = ShiftGenerator::new(&rotation)
        .for_window(window)
        .into_iter()
        .filter(|shift| !existing.iter().any(|e| e.starts_at == shift.starts_at))
        .map(Shift::into_persisted)
        .collect();

    if to_persist.is_empty() {
        return Ok(0);
    }
    let inserted = store.insert_shifts(to_persist)?;

    #[cfg(feature = "logging")]
    tracing::info!(rotation = %rotation_id, inserted, "persisted shifts");

    Ok(inserted)
}

/// Lance [`persist_shifts`] pour chaque rotation du store.
pub fn persist_all_shifts<S: ShiftStore + ?Sized>(
    store: &mut S,
    now: DateTime<Utc>,
    lookback: Months,
) -> anyhow::Result<usize> {
    let mut total = 0;
    for rotation_id in store.rotation_ids()? {
        total += persist_shifts(store, &rotation_id, now, lookback)
            .with_context(|| format!("persisting shifts for rotation {rotation_id}"))?;
    }
    Ok(total)
}
