#![forbid(unsafe_code)]
use anyhow::{bail, Context, Result};
use astreinte_rotations::{
    config::Config,
    io,
    model::{Participant, Rotation, RotationId, Roster, ShiftLengthUnit},
    persist::{persist_all_shifts, persist_shifts},
    reconciler::{ReadOptions, ShiftReconciler},
    storage::{JsonStorage, ShiftStore, Storage},
    Shift, Timeframe,
};
use chrono::{DateTime, Months, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI de rotations d'astreinte (planning calculé à la demande)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier de configuration TOML
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fichier JSON des rotations (prioritaire sur la configuration)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Créer une rotation
    CreateRotation {
        #[arg(long)]
        name: String,
        /// RFC3339 UTC ou YYYY-MM-DD
        #[arg(long)]
        starts_at: String,
        #[arg(long)]
        length: u32,
        /// hours | days | weeks
        #[arg(long, default_value = "days")]
        unit: String,
    },

    /// Ajouter un participant à une rotation
    AddParticipant {
        #[arg(long)]
        rotation: String,
        #[arg(long)]
        handle: String,
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        palette: String,
        #[arg(long)]
        weight: String,
    },

    /// Retirer un participant ; les shifts futurs sont redistribués
    RemoveParticipant {
        #[arg(long)]
        rotation: String,
        #[arg(long)]
        handle: String,
    },

    /// Importer des participants depuis un CSV
    ImportParticipants {
        #[arg(long)]
        rotation: String,
        #[arg(long)]
        csv: String,
    },

    /// Importer des shifts persistés (overrides) depuis un CSV
    ImportOverrides {
        #[arg(long)]
        rotation: String,
        #[arg(long)]
        csv: String,
    },

    /// Persister un shift manuel
    Override {
        #[arg(long)]
        rotation: String,
        #[arg(long)]
        handle: String,
        #[arg(long)]
        starts_at: String,
        #[arg(long)]
        ends_at: String,
    },

    /// Afficher le planning d'une fenêtre
    Shifts {
        #[arg(long)]
        rotation: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Retire les intervalles persistés du résultat
        #[arg(long)]
        exclude_persisted: bool,
        #[arg(long)]
        out_csv: Option<String>,
    },

    /// Qui est d'astreinte à un instant donné
    OnCall {
        #[arg(long)]
        rotation: String,
        /// RFC3339 UTC (défaut : maintenant)
        #[arg(long)]
        at: Option<String>,
    },

    /// Persister les shifts passés (une rotation ou toutes)
    Persist {
        #[arg(long)]
        rotation: Option<String>,
        #[arg(long)]
        months: Option<u32>,
    },

    /// Lister les rotations
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let config = Config::load_from(cli.config.as_deref()).context("loading configuration")?;
    let storage = JsonStorage::open(cli.store.as_ref().unwrap_or(&config.store))?;
    let mut roster = storage.load_or_default()?;

    let code = match cli.cmd {
        Commands::CreateRotation {
            name,
            starts_at,
            length,
            unit,
        } => {
            if roster.find_rotation_by_name(&name).is_some() {
                bail!("rotation already exists: {name}");
            }
            let unit: ShiftLengthUnit = unit.parse()?;
            let rotation = Rotation::new(name, io::parse_instant(&starts_at)?, length, unit)?;
            println!("{}", rotation.id());
            roster.rotations.push(rotation);
            storage.save(&roster)?;
            0
        }
        Commands::AddParticipant {
            rotation,
            handle,
            display_name,
            palette,
            weight,
        } => {
            let id = rotation_id(&roster, &rotation)?;
            let display = display_name.unwrap_or_else(|| handle.clone());
            let participant =
                Participant::new(handle, display, palette.parse()?, io::parse_weight(&weight)?);
            rotation_mut(&mut roster, &id)?.add_participant(participant)?;
            storage.save(&roster)?;
            0
        }
        Commands::RemoveParticipant { rotation, handle } => {
            let target = resolve(&roster, &rotation)?;
            let participant = target
                .find_participant_by_handle(&handle)
                .map(|p| p.id.clone())
                .ok_or_else(|| anyhow::anyhow!("unknown participant: {}", handle))?;
            let id = target.id().clone();
            rotation_mut(&mut roster, &id)?.remove_participant(&participant);
            storage.save(&roster)?;
            0
        }
        Commands::ImportParticipants { rotation, csv } => {
            let id = rotation_id(&roster, &rotation)?;
            let participants = io::import_participants_csv(csv)?;
            let target = rotation_mut(&mut roster, &id)?;
            for participant in participants {
                target.add_participant(participant)?;
            }
            storage.save(&roster)?;
            0
        }
        Commands::ImportOverrides { rotation, csv } => {
            let rotation = resolve(&roster, &rotation)?;
            let shifts = io::import_overrides_csv(csv, rotation)?;
            let inserted = roster.insert_shifts(shifts)?;
            println!("{inserted} shift(s) persisted");
            storage.save(&roster)?;
            0
        }
        Commands::Override {
            rotation,
            handle,
            starts_at,
            ends_at,
        } => {
            let rotation = resolve(&roster, &rotation)?;
            let participant = rotation
                .find_participant_by_handle(&handle)
                .ok_or_else(|| anyhow::anyhow!("unknown participant: {}", handle))?;
            let shift = Shift::persisted(
                rotation.id().clone(),
                participant.id.clone(),
                io::parse_instant(&starts_at)?,
                io::parse_instant(&ends_at)?,
            )?;
            roster.insert_shifts(vec![shift])?;
            storage.save(&roster)?;
            0
        }
        Commands::Shifts {
            rotation,
            from,
            to,
            exclude_persisted,
            out_csv,
        } => {
            let rotation = resolve(&roster, &rotation)?;
            let window = Timeframe::new(io::parse_instant(&from)?, io::parse_instant(&to)?);
            check_window(rotation, window, config.max_window_shifts)?;
            let opts = ReadOptions {
                include_persisted: !exclude_persisted,
            };
            let shifts = ShiftReconciler::new(&roster).read(rotation, window, opts)?;
            if let Some(path) = out_csv {
                io::export_shifts_csv(path, rotation, &shifts)?;
            }
            print!("{}", io::render_schedule(rotation, &shifts));
            if shifts.is_empty() {
                eprintln!("no shift in window");
                // Code 2 = WARNING/INCOMPLETE
                2
            } else {
                0
            }
        }
        Commands::OnCall { rotation, at } => {
            let rotation = resolve(&roster, &rotation)?;
            let at = match at {
                Some(raw) => io::parse_instant(&raw)?,
                None => Utc::now(),
            };
            let shifts = ShiftReconciler::new(&roster).read(
                rotation,
                window_around(at),
                ReadOptions::default(),
            )?;
            // un override persisté l'emporte sur le shift virtuel
            let covering = shifts
                .into_iter()
                .filter(|s| s.covers(at))
                .max_by_key(Shift::is_persisted);
            match covering {
                Some(shift) => {
                    print!("{}", io::render_schedule(rotation, &[shift]));
                    0
                }
                None => {
                    eprintln!("nobody on call at {}", at.to_rfc3339());
                    2
                }
            }
        }
        Commands::Persist { rotation, months } => {
            let lookback = Months::new(months.unwrap_or(config.backfill_months));
            let now = Utc::now();
            let inserted = match rotation {
                Some(key) => {
                    let id = rotation_id(&roster, &key)?;
                    persist_shifts(&mut roster, &id, now, lookback)?
                }
                None => persist_all_shifts(&mut roster, now, lookback)?,
            };
            println!("{inserted} shift(s) persisted");
            storage.save(&roster)?;
            0
        }
        Commands::List => {
            for r in &roster.rotations {
                println!(
                    "{} | {} | starts {} | {} {:?} | {} participant(s)",
                    r.id(),
                    r.name(),
                    r.starts_at().to_rfc3339(),
                    r.shift_length(),
                    r.shift_length_unit(),
                    r.participants().len()
                );
            }
            0
        }
    };

    std::process::exit(code);
}

fn resolve<'a>(roster: &'a Roster, key: &str) -> Result<&'a Rotation> {
    roster
        .resolve_rotation(key)
        .ok_or_else(|| anyhow::anyhow!("unknown rotation: {}", key))
}

fn rotation_id(roster: &Roster, key: &str) -> Result<RotationId> {
    resolve(roster, key).map(|r| r.id().clone())
}

fn rotation_mut<'a>(roster: &'a mut Roster, id: &RotationId) -> Result<&'a mut Rotation> {
    roster
        .find_rotation_mut(id)
        .ok_or_else(|| anyhow::anyhow!("unknown rotation: {}", id))
}

/// Fenêtre d'une milliseconde pour retrouver un override couvrant `at`.
fn window_around(at: DateTime<Utc>) -> Timeframe {
    Timeframe::new(at, at + chrono::Duration::milliseconds(1))
}

/// Refuse les fenêtres qui produiraient plus de `max` shifts.
fn check_window(rotation: &Rotation, window: Timeframe, max: u32) -> Result<()> {
    if window.ends_at <= window.starts_at {
        return Ok(());
    }
    let span = (window.ends_at - window.starts_at).num_milliseconds();
    let step = rotation.shift_duration().num_milliseconds();
    let estimate = span / step + 2;
    if estimate > i64::from(max) {
        bail!("window too large: about {estimate} shifts (max {max})");
    }
    Ok(())
}
