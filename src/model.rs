use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Identifiant fort pour Rotation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RotationId(String);

impl RotationId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifiant fort pour Participant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifiant fort pour Shift (présent uniquement sur les shifts persistés)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShiftId(String);

impl ShiftId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RotationError {
    #[error("shift length must be greater than zero")]
    InvalidShiftLength,
    #[error("shift length overflows the supported duration range")]
    ShiftLengthOverflow,
    #[error("participant already in rotation: {0}")]
    DuplicateParticipant(String),
    #[error("unknown shift length unit: {0}")]
    UnknownUnit(String),
    #[error("unknown color palette: {0}")]
    UnknownPalette(String),
    #[error("invalid color weight: {0}")]
    InvalidColorWeight(u16),
    #[error("invalid time range: end must be after start")]
    InvalidTimeRange,
}

/// Palette de couleur d'un participant ; l'ordre des variantes est l'ordre de rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorPalette {
    Blue,
    Orange,
    Aqua,
    Green,
    Magenta,
}

impl FromStr for ColorPalette {
    type Err = RotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blue" => Ok(Self::Blue),
            "orange" => Ok(Self::Orange),
            "aqua" => Ok(Self::Aqua),
            "green" => Ok(Self::Green),
            "magenta" => Ok(Self::Magenta),
            other => Err(RotationError::UnknownPalette(other.to_string())),
        }
    }
}

impl fmt::Display for ColorPalette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Blue => "blue",
            Self::Orange => "orange",
            Self::Aqua => "aqua",
            Self::Green => "green",
            Self::Magenta => "magenta",
        };
        f.write_str(name)
    }
}

/// Intensité de la couleur (50, 100, 200 … 950).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct ColorWeight(u16);

impl ColorWeight {
    pub const ALLOWED: [u16; 11] = [50, 100, 200, 300, 400, 500, 600, 700, 800, 900, 950];

    pub fn value(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for ColorWeight {
    type Error = RotationError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if Self::ALLOWED.contains(&value) {
            Ok(Self(value))
        } else {
            Err(RotationError::InvalidColorWeight(value))
        }
    }
}

impl From<ColorWeight> for u16 {
    fn from(weight: ColorWeight) -> Self {
        weight.0
    }
}

/// Participant d'une rotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub handle: String,
    pub display_name: String,
    pub color_palette: ColorPalette,
    pub color_weight: ColorWeight,
}

impl Participant {
    pub fn new<H: Into<String>, D: Into<String>>(
        handle: H,
        display_name: D,
        color_palette: ColorPalette,
        color_weight: ColorWeight,
    ) -> Self {
        Self {
            id: ParticipantId::random(),
            handle: handle.into(),
            display_name: display_name.into(),
            color_palette,
            color_weight,
        }
    }

    fn color_rank(&self) -> (ColorPalette, ColorWeight) {
        (self.color_palette, self.color_weight)
    }
}

/// Unité de longueur d'un shift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftLengthUnit {
    Hours,
    Days,
    Weeks,
}

impl FromStr for ShiftLengthUnit {
    type Err = RotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" | "hours" | "h" => Ok(Self::Hours),
            "day" | "days" | "d" => Ok(Self::Days),
            "week" | "weeks" | "w" => Ok(Self::Weeks),
            other => Err(RotationError::UnknownUnit(other.to_string())),
        }
    }
}

/// Rotation d'astreinte (UTC).
///
/// Les champs qui déterminent les bornes des shifts (`starts_at`, longueur, unité)
/// ne sont pas modifiables après construction : les changer décalerait tous les
/// shifts virtuels déjà calculés.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RotationRecord")]
pub struct Rotation {
    id: RotationId,
    name: String,
    starts_at: DateTime<Utc>,
    shift_length: u32,
    shift_length_unit: ShiftLengthUnit,
    #[serde(skip)]
    shift_duration: Duration,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    participants: Vec<Participant>,
}

/// Forme brute désérialisée, validée via `TryFrom`.
#[derive(Deserialize)]
struct RotationRecord {
    id: RotationId,
    name: String,
    starts_at: DateTime<Utc>,
    shift_length: u32,
    shift_length_unit: ShiftLengthUnit,
    #[serde(default)]
    participants: Vec<Participant>,
}

impl TryFrom<RotationRecord> for Rotation {
    type Error = RotationError;

    fn try_from(raw: RotationRecord) -> Result<Self, Self::Error> {
        let mut rotation = Rotation::with_id(
            raw.id,
            raw.name,
            raw.starts_at,
            raw.shift_length,
            raw.shift_length_unit,
        )?;
        for participant in raw.participants {
            rotation.add_participant(participant)?;
        }
        Ok(rotation)
    }
}

impl Rotation {
    /// Crée une rotation en validant que la durée d'un shift est strictement positive.
    pub fn new<N: Into<String>>(
        name: N,
        starts_at: DateTime<Utc>,
        shift_length: u32,
        shift_length_unit: ShiftLengthUnit,
    ) -> Result<Self, RotationError> {
        Self::with_id(
            RotationId::random(),
            name.into(),
            starts_at,
            shift_length,
            shift_length_unit,
        )
    }

    pub fn with_id(
        id: RotationId,
        name: String,
        starts_at: DateTime<Utc>,
        shift_length: u32,
        shift_length_unit: ShiftLengthUnit,
    ) -> Result<Self, RotationError> {
        if shift_length == 0 {
            return Err(RotationError::InvalidShiftLength);
        }
        let shift_duration = compute_duration(shift_length, shift_length_unit)?;
        Ok(Self {
            id,
            name,
            starts_at,
            shift_length,
            shift_length_unit,
            shift_duration,
            participants: Vec::new(),
        })
    }

    pub fn id(&self) -> &RotationId {
        &self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }
    pub fn shift_length(&self) -> u32 {
        self.shift_length
    }
    pub fn shift_length_unit(&self) -> ShiftLengthUnit {
        self.shift_length_unit
    }

    /// Durée d'un shift, toujours > 0.
    pub fn shift_duration(&self) -> Duration {
        self.shift_duration
    }

    /// Participants dans leur ordre d'insertion.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Participants dans l'ordre de rotation : palette puis intensité,
    /// l'ordre d'insertion départage les égalités.
    pub fn color_ordered_participants(&self) -> Vec<&Participant> {
        let mut ordered: Vec<&Participant> = self.participants.iter().collect();
        ordered.sort_by_key(|p| p.color_rank());
        ordered
    }

    pub fn add_participant(&mut self, participant: Participant) -> Result<(), RotationError> {
        let duplicate = self
            .participants
            .iter()
            .any(|p| p.id == participant.id || p.handle == participant.handle);
        if duplicate {
            return Err(RotationError::DuplicateParticipant(participant.handle));
        }
        self.participants.push(participant);
        Ok(())
    }

    pub fn remove_participant(&mut self, id: &ParticipantId) -> Option<Participant> {
        let pos = self.participants.iter().position(|p| &p.id == id)?;
        Some(self.participants.remove(pos))
    }

    pub fn find_participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    pub fn find_participant_by_handle(&self, handle: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.handle == handle)
    }
}

fn compute_duration(length: u32, unit: ShiftLengthUnit) -> Result<Duration, RotationError> {
    let length = i64::from(length);
    let duration = match unit {
        ShiftLengthUnit::Hours => Duration::try_hours(length),
        ShiftLengthUnit::Days => Duration::try_days(length),
        ShiftLengthUnit::Weeks => Duration::try_weeks(length),
    };
    duration.ok_or(RotationError::ShiftLengthOverflow)
}

/// Fenêtre de temps demandée `[starts_at, ends_at)` ; une fenêtre vide ou inversée est permise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeframe {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl Timeframe {
    pub fn new(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Self {
        Self { starts_at, ends_at }
    }

    /// Vrai si `[start, end)` chevauche la fenêtre.
    pub fn intersects(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.ends_at && self.starts_at < end
    }
}

/// Créneau d'astreinte (UTC), virtuel (`id == None`) ou persisté.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ShiftId>,
    pub rotation_id: RotationId,
    pub participant: ParticipantId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl Shift {
    /// Shift calculé en mémoire, jamais enregistré tel quel.
    pub fn unsaved(
        rotation_id: RotationId,
        participant: ParticipantId,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            rotation_id,
            participant,
            starts_at,
            ends_at,
        }
    }

    /// Crée un shift persisté (override manuel) en validant que `ends_at > starts_at`.
    pub fn persisted(
        rotation_id: RotationId,
        participant: ParticipantId,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<Self, RotationError> {
        if ends_at <= starts_at {
            return Err(RotationError::InvalidTimeRange);
        }
        Ok(Self {
            id: Some(ShiftId::random()),
            rotation_id,
            participant,
            starts_at,
            ends_at,
        })
    }

    /// Donne une identité durable à un shift virtuel.
    pub fn into_persisted(mut self) -> Self {
        if self.id.is_none() {
            self.id = Some(ShiftId::random());
        }
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn interval(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.starts_at, self.ends_at)
    }

    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.starts_at <= at && at < self.ends_at
    }
}

/// Document complet : rotations et shifts persistés
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Roster {
    #[serde(default)]
    pub rotations: Vec<Rotation>,
    #[serde(default)]
    pub shifts: Vec<Shift>,
}

impl Roster {
    pub fn find_rotation<'a>(&'a self, id: &RotationId) -> Option<&'a Rotation> {
        self.rotations.iter().find(|r| &r.id == id)
    }
    pub fn find_rotation_by_name<'a>(&'a self, name: &str) -> Option<&'a Rotation> {
        self.rotations.iter().find(|r| r.name == name)
    }
    pub fn find_rotation_mut(&mut self, id: &RotationId) -> Option<&mut Rotation> {
        self.rotations.iter_mut().find(|r| &r.id == id)
    }
    /// Cherche par nom puis par identifiant.
    pub fn resolve_rotation<'a>(&'a self, key: &str) -> Option<&'a Rotation> {
        self.find_rotation_by_name(key)
            .or_else(|| self.find_rotation(&RotationId::new(key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn weight(w: u16) -> ColorWeight {
        ColorWeight::try_from(w).unwrap()
    }

    #[test]
    fn zero_shift_length_is_rejected() {
        let t0 = Utc.with_ymd_and_hms(2020, 12, 8, 0, 0, 0).unwrap();
        let err = Rotation::new("primary", t0, 0, ShiftLengthUnit::Days).unwrap_err();
        assert_eq!(err, RotationError::InvalidShiftLength);
    }

    #[test]
    fn shift_duration_follows_unit() {
        let t0 = Utc.with_ymd_and_hms(2020, 12, 8, 0, 0, 0).unwrap();
        let r = Rotation::new("r", t0, 36, ShiftLengthUnit::Hours).unwrap();
        assert_eq!(r.shift_duration(), Duration::hours(36));
        let r = Rotation::new("r", t0, 2, ShiftLengthUnit::Weeks).unwrap();
        assert_eq!(r.shift_duration(), Duration::days(14));
    }

    #[test]
    fn color_order_sorts_by_palette_then_weight() {
        let t0 = Utc.with_ymd_and_hms(2020, 12, 8, 0, 0, 0).unwrap();
        let mut r = Rotation::new("r", t0, 1, ShiftLengthUnit::Days).unwrap();
        r.add_participant(Participant::new("m", "M", ColorPalette::Magenta, weight(50)))
            .unwrap();
        r.add_participant(Participant::new("b200", "B", ColorPalette::Blue, weight(200)))
            .unwrap();
        r.add_participant(Participant::new("b50", "B", ColorPalette::Blue, weight(50)))
            .unwrap();

        let handles: Vec<&str> = r
            .color_ordered_participants()
            .iter()
            .map(|p| p.handle.as_str())
            .collect();
        assert_eq!(handles, ["b50", "b200", "m"]);
    }

    #[test]
    fn duplicate_handle_is_rejected() {
        let t0 = Utc.with_ymd_and_hms(2020, 12, 8, 0, 0, 0).unwrap();
        let mut r = Rotation::new("r", t0, 1, ShiftLengthUnit::Days).unwrap();
        r.add_participant(Participant::new("alice", "Alice", ColorPalette::Blue, weight(50)))
            .unwrap();
        let err = r
            .add_participant(Participant::new("alice", "Alice", ColorPalette::Aqua, weight(50)))
            .unwrap_err();
        assert!(matches!(err, RotationError::DuplicateParticipant(_)));
    }

    #[test]
    fn removing_a_participant_keeps_the_others() {
        let t0 = Utc.with_ymd_and_hms(2020, 12, 8, 0, 0, 0).unwrap();
        let mut r = Rotation::new("r", t0, 1, ShiftLengthUnit::Days).unwrap();
        let alice = Participant::new("alice", "Alice", ColorPalette::Blue, weight(50));
        let alice_id = alice.id.clone();
        r.add_participant(alice).unwrap();
        r.add_participant(Participant::new("bob", "Bob", ColorPalette::Blue, weight(100)))
            .unwrap();

        assert_eq!(r.remove_participant(&alice_id).map(|p| p.handle), Some("alice".into()));
        assert!(r.remove_participant(&alice_id).is_none());
        assert_eq!(r.participants().len(), 1);
    }

    #[test]
    fn invalid_weight_is_rejected() {
        assert_eq!(
            ColorWeight::try_from(75_u16),
            Err(RotationError::InvalidColorWeight(75))
        );
    }

    #[test]
    fn deserializing_zero_length_rotation_fails() {
        let json = r#"{
            "id": "r1",
            "name": "primary",
            "starts_at": "2020-12-08T00:00:00Z",
            "shift_length": 0,
            "shift_length_unit": "days"
        }"#;
        let parsed: Result<Rotation, _> = serde_json::from_str(json);
        assert!(parsed.is_err());
    }

    #[test]
    fn persisted_shift_requires_positive_range() {
        let t0 = Utc.with_ymd_and_hms(2020, 12, 8, 0, 0, 0).unwrap();
        let err = Shift::persisted(RotationId::new("r"), ParticipantId::new("p"), t0, t0)
            .unwrap_err();
        assert_eq!(err, RotationError::InvalidTimeRange);
    }
}
