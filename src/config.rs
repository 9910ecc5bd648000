//! Configuration de la CLI : valeurs par défaut, fichier TOML, puis variables
//! d'environnement `ASTREINTE_*`.

use crate::persist::DEFAULT_LOOKBACK_MONTHS;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fichier lu dans le répertoire courant s'il existe.
pub const DEFAULT_CONFIG_FILE: &str = "astreinte.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Fichier JSON des rotations et shifts persistés.
    pub store: PathBuf,
    /// Plafond du nombre de shifts calculés pour une fenêtre demandée.
    pub max_window_shifts: u32,
    /// Profondeur du snapshot des shifts passés, en mois.
    pub backfill_months: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: PathBuf::from("rotations.json"),
            max_window_shifts: 10_000,
            backfill_months: DEFAULT_LOOKBACK_MONTHS,
        }
    }
}

impl Config {
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(DEFAULT_CONFIG_FILE));

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed("ASTREINTE_")).extract()
    }
}
