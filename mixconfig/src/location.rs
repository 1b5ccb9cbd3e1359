//! Choix et vérification du répertoire de configuration

use anyhow::{Result, bail};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Variable d'environnement désignant le répertoire de configuration
pub const ENV_CONFIG_DIR: &str = "MIXDECK_CONFIG";

const DIR_NAME: &str = ".mixdeck";

/// Répertoire à utiliser, par ordre de préférence :
/// l'argument, `$MIXDECK_CONFIG`, `./.mixdeck` s'il existe,
/// `~/.mixdeck` s'il existe, et enfin `./.mixdeck`.
pub(crate) fn resolve(explicit: &str) -> PathBuf {
    if !explicit.is_empty() {
        return PathBuf::from(explicit);
    }

    if let Ok(from_env) = env::var(ENV_CONFIG_DIR) {
        if !from_env.is_empty() {
            debug!(env_var = ENV_CONFIG_DIR, path = %from_env, "Config directory taken from env");
            return PathBuf::from(from_env);
        }
    }

    let local = PathBuf::from(DIR_NAME);
    if local.is_dir() {
        return local;
    }

    dirs::home_dir()
        .map(|home| home.join(DIR_NAME))
        .filter(|candidate| candidate.is_dir())
        .unwrap_or(local)
}

/// Crée le répertoire au besoin et vérifie qu'on peut y lire et écrire
pub(crate) fn ensure_usable(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let probe = dir.join(".write_test");
    fs::write(&probe, b"ok")?;
    fs::remove_file(&probe)?;
    fs::read_dir(dir)?;
    Ok(())
}
