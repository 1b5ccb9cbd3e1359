//! Outils externes : téléchargeur (yt-dlp) et sonde (ffprobe)
//!
//! Les deux outils sont vus à travers des traits pour que le worker
//! d'acquisition puisse être testé sans lancer de processus.

use crate::error::{Result, TrackError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::debug;
use utoipa::ToSchema;

/// Nombre de caractères du flux d'erreur conservés comme diagnostic
pub const DIAGNOSTIC_TAIL: usize = 200;

/// Format audio demandé pour une acquisition distante
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Wav,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
        }
    }

    /// Garde de taille passée au téléchargeur
    pub fn max_filesize(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "100M",
            AudioFormat::Wav => "200M",
        }
    }
}

/// Métadonnées distantes, toutes facultatives
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoteInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl RemoteInfo {
    /// L'uploader, à défaut l'artiste
    pub fn display_artist(&self) -> Option<&str> {
        self.uploader.as_deref().or(self.artist.as_deref())
    }
}

/// Paramètres d'une extraction audio
#[derive(Debug, Clone)]
pub struct AudioRequest {
    pub url: String,
    /// Répertoire de sortie
    pub output_dir: PathBuf,
    /// Nom de base du fichier produit (l'identifiant de la piste)
    pub stem: String,
    pub format: AudioFormat,
    /// Débit en kbit/s, utilisé pour le mp3 seulement
    pub quality: String,
}

impl AudioRequest {
    /// Gabarit de sortie : l'outil choisit l'extension finale
    pub fn output_template(&self) -> PathBuf {
        self.output_dir.join(format!("{}.%(ext)s", self.stem))
    }

    /// Nom du fichier attendu si l'outil respecte le format demandé
    pub fn expected_filename(&self) -> String {
        format!("{}.{}", self.stem, self.format.extension())
    }
}

/// Téléchargeur de médias distants
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Interroge les métadonnées sans rien télécharger
    async fn fetch_info(&self, url: &str) -> Result<RemoteInfo>;

    /// Extrait et transcode l'audio selon `request`
    async fn download_audio(&self, request: &AudioRequest) -> Result<()>;
}

/// Sonde de fichiers audio
#[async_trait]
pub trait Prober: Send + Sync {
    /// Durée en secondes, `None` si l'outil ne la donne pas
    async fn probe_duration(&self, path: &Path) -> Result<Option<f64>>;
}

/// Les `max` derniers caractères de `text`
pub fn tail_chars(text: &str, max: usize) -> &str {
    let count = text.chars().count();
    if count <= max {
        return text;
    }
    match text.char_indices().nth(count - max) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

async fn run(program: &str, args: &[String]) -> Result<Output> {
    debug!(program, ?args, "Spawning external tool");
    Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| TrackError::Tool {
            tool: program.to_string(),
            diagnostic: format!("cannot run {}: {}", program, e),
        })
}

fn check(program: &str, output: Output) -> Result<Output> {
    if output.status.success() {
        return Ok(output);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(TrackError::Tool {
        tool: program.to_string(),
        diagnostic: tail_chars(&stderr, DIAGNOSTIC_TAIL).to_string(),
    })
}

/// [`Downloader`] adossé à `yt-dlp`
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: String,
}

impl YtDlp {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn info_args(url: &str) -> Vec<String> {
        ["--dump-json", "--no-download", "--no-playlist", url]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn audio_args(request: &AudioRequest) -> Vec<String> {
        let mut args = vec![
            "-x".to_string(),
            "--audio-format".to_string(),
            request.format.extension().to_string(),
        ];
        if request.format == AudioFormat::Mp3 {
            args.push("--audio-quality".to_string());
            args.push(format!("{}K", request.quality));
        }
        args.extend([
            "-o".to_string(),
            request.output_template().to_string_lossy().into_owned(),
            "--no-playlist".to_string(),
            "--max-filesize".to_string(),
            request.format.max_filesize().to_string(),
            request.url.clone(),
        ]);
        args
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl Downloader for YtDlp {
    async fn fetch_info(&self, url: &str) -> Result<RemoteInfo> {
        let output = check(&self.program, run(&self.program, &Self::info_args(url)).await?)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        // une seule ligne attendue, mais certaines URL renvoient une ligne par entrée
        let first = stdout.trim().lines().next().unwrap_or_default();
        Ok(serde_json::from_str(first)?)
    }

    async fn download_audio(&self, request: &AudioRequest) -> Result<()> {
        check(&self.program, run(&self.program, &Self::audio_args(request)).await?)?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    // ffprobe publie la durée sous forme de chaîne
    #[serde(default)]
    duration: Option<String>,
}

/// [`Prober`] adossé à `ffprobe`
#[derive(Debug, Clone)]
pub struct FfProbe {
    program: String,
}

impl FfProbe {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn parse_duration(stdout: &[u8]) -> Result<Option<f64>> {
        let probe: ProbeOutput = serde_json::from_slice(stdout)?;
        Ok(probe
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.trim().parse::<f64>().ok()))
    }
}

impl Default for FfProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[async_trait]
impl Prober for FfProbe {
    async fn probe_duration(&self, path: &Path) -> Result<Option<f64>> {
        let args = vec![
            "-v".to_string(),
            "quiet".to_string(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-of".to_string(),
            "json".to_string(),
            path.to_string_lossy().into_owned(),
        ];
        let output = check(&self.program, run(&self.program, &args).await?)?;
        Self::parse_duration(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(format: AudioFormat) -> AudioRequest {
        AudioRequest {
            url: "https://example.com/v".into(),
            output_dir: PathBuf::from("/data/tracks"),
            stem: "ab12cd34".into(),
            format,
            quality: "192".into(),
        }
    }

    #[test]
    fn test_tail_chars() {
        assert_eq!(tail_chars("short", 200), "short");
        assert_eq!(tail_chars("abcdef", 3), "def");
        // coupe sur une frontière de caractère
        assert_eq!(tail_chars("ééé", 2), "éé");
    }

    #[test]
    fn test_mp3_args_carry_quality_and_size_guard() {
        let args = YtDlp::audio_args(&request(AudioFormat::Mp3));
        let joined = args.join(" ");
        assert!(joined.starts_with("-x --audio-format mp3 --audio-quality 192K -o "));
        assert!(joined.contains("/data/tracks/ab12cd34.%(ext)s"));
        assert!(joined.ends_with("--no-playlist --max-filesize 100M https://example.com/v"));
    }

    #[test]
    fn test_wav_args_skip_quality() {
        let args = YtDlp::audio_args(&request(AudioFormat::Wav));
        assert!(!args.iter().any(|a| a == "--audio-quality"));
        assert!(args.windows(2).any(|w| w[0] == "--max-filesize" && w[1] == "200M"));
    }

    #[test]
    fn test_info_args() {
        assert_eq!(
            YtDlp::info_args("u"),
            vec!["--dump-json", "--no-download", "--no-playlist", "u"]
        );
    }

    #[test]
    fn test_remote_info_prefers_uploader() {
        let info: RemoteInfo =
            serde_json::from_str(r#"{"title":"T","uploader":"U","artist":"A","duration":12.5}"#)
                .unwrap();
        assert_eq!(info.display_artist(), Some("U"));
        let info: RemoteInfo = serde_json::from_str(r#"{"artist":"A"}"#).unwrap();
        assert_eq!(info.display_artist(), Some("A"));
    }

    #[test]
    fn test_parse_probe_duration() {
        let out = br#"{"format":{"duration":"183.512000"}}"#;
        assert_eq!(FfProbe::parse_duration(out).unwrap(), Some(183.512));
        assert_eq!(FfProbe::parse_duration(b"{}").unwrap(), None);
        assert!(FfProbe::parse_duration(b"not json").is_err());
    }

    #[test]
    fn test_format_deserializes_lowercase() {
        let f: AudioFormat = serde_json::from_str("\"wav\"").unwrap();
        assert_eq!(f, AudioFormat::Wav);
        assert_eq!(AudioFormat::default().extension(), "mp3");
    }
}
