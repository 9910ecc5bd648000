use crate::model::{ColorPalette, ColorWeight, Participant, Rotation, Shift};
use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use std::fmt::Write as _;
use std::path::Path;

/// Import de participants depuis CSV: header `handle,display_name,color_palette,color_weight`
pub fn import_participants_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Participant>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let handle = rec.get(0).context("missing handle")?.trim();
        let display = rec.get(1).context("missing display_name")?.trim();
        if handle.is_empty() || display.is_empty() {
            bail!("invalid participant row (empty)");
        }
        let palette: ColorPalette = rec
            .get(2)
            .context("missing color_palette")?
            .parse()
            .with_context(|| format!("invalid color_palette for handle {handle}"))?;
        let weight = parse_weight(rec.get(3).context("missing color_weight")?)
            .with_context(|| format!("invalid color_weight for handle {handle}"))?;
        out.push(Participant::new(handle, display, palette, weight));
    }
    Ok(out)
}

pub fn parse_weight(raw: &str) -> anyhow::Result<ColorWeight> {
    let value: u16 = raw.trim().parse().context("expected an integer weight")?;
    Ok(ColorWeight::try_from(value)?)
}

/// Import d'overrides persistés: header `participant_handle,starts_at,ends_at`
pub fn import_overrides_csv<P: AsRef<Path>>(
    path: P,
    rotation: &Rotation,
) -> anyhow::Result<Vec<Shift>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let handle = rec.get(0).context("missing participant_handle")?.trim();
        let participant = rotation
            .find_participant_by_handle(handle)
            .with_context(|| format!("unknown participant {handle} in rotation {}", rotation.name()))?;
        let start = parse_instant(rec.get(1).context("missing starts_at")?.trim())
            .context("starts_at")?;
        let end = parse_instant(rec.get(2).context("missing ends_at")?.trim())
            .context("ends_at")?;
        let shift = Shift::persisted(rotation.id().clone(), participant.id.clone(), start, end)?;
        out.push(shift);
    }
    Ok(out)
}

/// Instant UTC : RFC3339, ou date seule (minuit UTC).
pub fn parse_instant(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(dt) = raw.parse::<DateTime<Utc>>() {
        return Ok(dt);
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date/datetime: {raw}"))?;
    let datetime = date
        .and_hms_opt(0, 0, 0)
        .context("invalid midnight conversion")?;
    Ok(Utc.from_utc_datetime(&datetime))
}

/// Export CSV d'un planning: header `id,participant,starts_at,ends_at,persisted`
pub fn export_shifts_csv<P: AsRef<Path>>(
    path: P,
    rotation: &Rotation,
    shifts: &[Shift],
) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record(["id", "participant", "starts_at", "ends_at", "persisted"])?;
    for s in shifts {
        let id = s.id.as_ref().map(|id| id.as_str()).unwrap_or("");
        let start = s.starts_at.to_rfc3339();
        let end = s.ends_at.to_rfc3339();
        w.write_record([
            id,
            participant_handle(rotation, s),
            start.as_str(),
            end.as_str(),
            if s.is_persisted() { "true" } else { "false" },
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Rendu texte, une ligne par shift.
pub fn render_schedule(rotation: &Rotation, shifts: &[Shift]) -> String {
    let mut out = String::new();
    for s in shifts {
        let _ = writeln!(
            out,
            "{} → {} | {} | {}",
            s.starts_at.to_rfc3339(),
            s.ends_at.to_rfc3339(),
            participant_handle(rotation, s),
            if s.is_persisted() { "persisted" } else { "virtual" }
        );
    }
    out
}

fn participant_handle<'a>(rotation: &'a Rotation, shift: &'a Shift) -> &'a str {
    rotation
        .find_participant(&shift.participant)
        .map(|p| p.handle.as_str())
        .unwrap_or(shift.participant.as_str())
}
