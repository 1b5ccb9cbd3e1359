#![allow(dead_code)]

use async_trait::async_trait;
use mixtracks::store::DEFAULT_DB_FILE;
use mixtracks::{
    AudioRequest, Downloader, Prober, RemoteInfo, Result, Track, TrackError, TrackLibrary,
    TrackStatus,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Ce que produit le faux téléchargeur
#[derive(Clone)]
pub enum Outcome {
    /// Écrit `ID.extension` avec ces octets
    Write { extension: String, bytes: Vec<u8> },
    /// Sortie en erreur avec ce flux d'erreur
    Fail(String),
    /// Réussit sans rien écrire
    Nothing,
    /// Panique pendant l'extraction
    Panic(String),
}

pub struct FakeDownloader {
    pub info: Option<RemoteInfo>,
    pub outcome: Outcome,
    /// Bloque l'extraction jusqu'à notification
    pub gate: Option<Arc<Notify>>,
}

impl FakeDownloader {
    pub fn writing(extension: &str) -> Self {
        Self {
            info: None,
            outcome: Outcome::Write {
                extension: extension.to_string(),
                bytes: vec![7u8; 64],
            },
            gate: None,
        }
    }

    pub fn failing(stderr: &str) -> Self {
        Self {
            info: None,
            outcome: Outcome::Fail(stderr.to_string()),
            gate: None,
        }
    }

    pub fn with_info(mut self, info: RemoteInfo) -> Self {
        self.info = Some(info);
        self
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn fetch_info(&self, _url: &str) -> Result<RemoteInfo> {
        self.info.clone().ok_or_else(|| TrackError::Tool {
            tool: "fake".into(),
            diagnostic: "ERROR: metadata unavailable".into(),
        })
    }

    async fn download_audio(&self, request: &AudioRequest) -> Result<()> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.outcome {
            Outcome::Write { extension, bytes } => {
                let path = request
                    .output_dir
                    .join(format!("{}.{}", request.stem, extension));
                tokio::fs::write(path, bytes).await?;
                Ok(())
            }
            Outcome::Fail(stderr) => Err(TrackError::Tool {
                tool: "fake".into(),
                diagnostic: stderr.clone(),
            }),
            Outcome::Nothing => Ok(()),
            Outcome::Panic(message) => panic!("{message}"),
        }
    }
}

/// Sonde qui renvoie une durée fixe, ou échoue si `None`
pub struct FakeProber(pub Option<f64>);

#[async_trait]
impl Prober for FakeProber {
    async fn probe_duration(&self, _path: &Path) -> Result<Option<f64>> {
        match self.0 {
            Some(d) => Ok(Some(d)),
            None => Err(TrackError::Tool {
                tool: "fake-probe".into(),
                diagnostic: "not installed".into(),
            }),
        }
    }
}

pub async fn open_library(
    dir: &Path,
    downloader: FakeDownloader,
    prober: FakeProber,
) -> anyhow::Result<Arc<TrackLibrary>> {
    let library =
        TrackLibrary::open(dir, DEFAULT_DB_FILE, Arc::new(downloader), Arc::new(prober)).await?;
    Ok(Arc::new(library))
}

/// Attend que la piste quitte l'état `downloading`
pub async fn wait_settled(library: &TrackLibrary, id: &str) -> Track {
    for _ in 0..250 {
        if let Some(track) = library.store().get(id).await {
            if track.status != TrackStatus::Downloading {
                return track;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("track {id} is still downloading");
}
