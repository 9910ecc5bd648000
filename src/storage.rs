use crate::model::{Participant, Rotation, RotationId, Roster, Shift, Timeframe};
use anyhow::Context;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown rotation: {0}")]
    UnknownRotation(String),
    #[error("unknown participant {participant} for rotation {rotation}")]
    UnknownParticipant { rotation: String, participant: String },
    #[error("a shift already starts at {starts_at} for rotation {rotation}")]
    DuplicateShiftStart { rotation: String, starts_at: String },
    #[error("refusing to store a shift without identity")]
    VirtualShift,
}

/// Collaborateur de persistance consommé par le réconciliateur et le job de snapshot.
pub trait ShiftStore {
    fn find_rotation(&self, id: &RotationId) -> anyhow::Result<Option<Rotation>>;
    /// Participants dans l'ordre de rotation.
    fn find_participants(&self, id: &RotationId) -> anyhow::Result<Vec<Participant>>;
    /// Shifts persistés qui chevauchent `timeframe`, triés par début.
    fn find_persisted_shifts(
        &self,
        id: &RotationId,
        timeframe: Timeframe,
    ) -> anyhow::Result<Vec<Shift>>;
    fn rotation_ids(&self) -> anyhow::Result<Vec<RotationId>>;
    /// Insère tous les shifts ou aucun ; renvoie le nombre inséré.
    fn insert_shifts(&mut self, shifts: Vec<Shift>) -> anyhow::Result<usize>;
}

impl ShiftStore for Roster {
    fn find_rotation(&self, id: &RotationId) -> anyhow::Result<Option<Rotation>> {
        Ok(Roster::find_rotation(self, id).cloned())
    }

    fn find_participants(&self, id: &RotationId) -> anyhow::Result<Vec<Participant>> {
        let rotation = Roster::find_rotation(self, id)
            .ok_or_else(|| StoreError::UnknownRotation(id.to_string()))?;
        Ok(rotation
            .color_ordered_participants()
            .into_iter()
            .cloned()
            .collect())
    }

    fn find_persisted_shifts(
        &self,
        id: &RotationId,
        timeframe: Timeframe,
    ) -> anyhow::Result<Vec<Shift>> {
        let mut found: Vec<Shift> = self
            .shifts
            .iter()
            .filter(|s| &s.rotation_id == id && timeframe.intersects(s.starts_at, s.ends_at))
            .cloned()
            .collect();
        found.sort_by_key(|s| s.starts_at);
        Ok(found)
    }

    fn rotation_ids(&self) -> anyhow::Result<Vec<RotationId>> {
        Ok(self.rotations.iter().map(|r| r.id().clone()).collect())
    }

    fn insert_shifts(&mut self, shifts: Vec<Shift>) -> anyhow::Result<usize> {
        let mut taken: HashSet<(RotationId, _)> = self
            .shifts
            .iter()
            .map(|s| (s.rotation_id.clone(), s.starts_at))
            .collect();

        for shift in &shifts {
            if !shift.is_persisted() {
                return Err(StoreError::VirtualShift.into());
            }
            let rotation = Roster::find_rotation(self, &shift.rotation_id)
                .ok_or_else(|| StoreError::UnknownRotation(shift.rotation_id.to_string()))?;
            if rotation.find_participant(&shift.participant).is_none() {
                return Err(StoreError::UnknownParticipant {
                    rotation: shift.rotation_id.to_string(),
                    participant: shift.participant.as_str().to_string(),
                }
                .into());
            }
            if !taken.insert((shift.rotation_id.clone(), shift.starts_at)) {
                return Err(StoreError::DuplicateShiftStart {
                    rotation: shift.rotation_id.to_string(),
                    starts_at: shift.starts_at.to_rfc3339(),
                }
                .into());
            }
        }

        let inserted = shifts.len();
        self.shifts.extend(shifts);
        Ok(inserted)
    }
}

pub trait Storage {
    /// Charge un roster depuis un support.
    fn load(&self) -> anyhow::Result<Roster>;
    /// Sauvegarde de manière atomique.
    fn save(&self, roster: &Roster) -> anyhow::Result<()>;
}

pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Ok(Self {
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Roster vide si le fichier n'existe pas encore ; toute autre erreur remonte.
    pub fn load_or_default(&self) -> anyhow::Result<Roster> {
        if !self.path.exists() {
            return Ok(Roster::default());
        }
        self.load()
    }
}

impl Storage for JsonStorage {
    fn load(&self) -> anyhow::Result<Roster> {
        let data =
            fs::read(&self.path).with_context(|| format!("reading {}", self.path.display()))?;
        let roster: Roster = serde_json::from_slice(&data)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(roster)
    }

    fn save(&self, roster: &Roster) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(roster)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).with_context(|| "creating temp file")?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).with_context(|| "atomic rename")?;
        Ok(())
    }
}
