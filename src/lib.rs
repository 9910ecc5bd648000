#![forbid(unsafe_code)]
//! Astreinte rotations : moteur de génération des shifts d'une rotation d'astreinte.
//!
//! - Planning virtuel infini, calculé à la demande (round-robin, arithmétique entière).
//! - Fusion avec les shifts persistés (overrides manuels, snapshots).
//! - Stockage fichier JSON atomique, imports/exports CSV.
//! - Tout en UTC ; parsing RFC3339 ; affichage local en dehors de la lib.

pub mod config;
pub mod generator;
pub mod io;
pub mod model;
pub mod persist;
pub mod reconciler;
pub mod storage;

pub use config::Config;
pub use generator::{generate_shift_covering, generate_shifts_for_window, ShiftGenerator};
pub use model::{
    ColorPalette, ColorWeight, Participant, ParticipantId, Rotation, RotationError, RotationId,
    Roster, Shift, ShiftId, ShiftLengthUnit, Timeframe,
};
pub use persist::{persist_all_shifts, persist_shifts, DEFAULT_LOOKBACK_MONTHS};
pub use reconciler::{read_shifts, ReadOptions, ShiftReconciler};
pub use storage::{JsonStorage, ShiftStore, Storage, StoreError};
