//! Fusion du planning virtuel avec les shifts persistés.
//!
//! Un shift persisté fait autorité sur l'intervalle exact qu'il occupe, même
//! s'il affecte un autre participant (échange manuel). L'identité retenue pour
//! dédoublonner est l'intervalle `(starts_at, ends_at)`, pas l'identifiant.

use crate::generator::ShiftGenerator;
use crate::model::{Rotation, Shift, Timeframe};
use crate::storage::ShiftStore;
use chrono::{DateTime, Utc};

/// Options de lecture
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// Réintègre les shifts persistés dans le résultat.
    pub include_persisted: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            include_persisted: true,
        }
    }
}

pub struct ShiftReconciler<'s, S: ShiftStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: ShiftStore + ?Sized> ShiftReconciler<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Planning effectif de `rotation` sur `window`, trié par début.
    ///
    /// Une seule lecture du store par appel ; ses erreurs remontent telles quelles.
    pub fn read(
        &self,
        rotation: &Rotation,
        window: Timeframe,
        opts: ReadOptions,
    ) -> anyhow::Result<Vec<Shift>> {
        let persisted = self.store.find_persisted_shifts(rotation.id(), window)?;
        let generated = ShiftGenerator::new(rotation).for_window(window);

        let mut shifts: Vec<Shift> = generated
            .into_iter()
            .filter(|shift| !persisted.iter().any(|p| p.interval() == shift.interval()))
            .collect();

        #[cfg(feature = "logging")]
        tracing::debug!(
            rotation = %rotation.id(),
            generated = shifts.len(),
            persisted = persisted.len(),
            include_persisted = opts.include_persisted,
            "reconciled shifts"
        );

        if opts.include_persisted {
            shifts.extend(persisted);
        }
        shifts.sort_by_key(|s| s.starts_at);
        Ok(shifts)
    }
}

/// Planning effectif sur `[starts_at, ends_at)`.
pub fn read_shifts<S: ShiftStore + ?Sized>(
    store: &S,
    rotation: &Rotation,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    include_persisted: bool,
) -> anyhow::Result<Vec<Shift>> {
    ShiftReconciler::new(store).read(
        rotation,
        Timeframe::new(starts_at, ends_at),
        ReadOptions { include_persisted },
    )
}
