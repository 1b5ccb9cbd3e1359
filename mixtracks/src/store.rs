//! Catalogue persistant des pistes
//!
//! Le catalogue est un unique document JSON (`tracks_db.json`) rangé dans le
//! répertoire des pistes, à côté des fichiers audio. Il associe un identifiant
//! à chaque [`Track`] et il est réécrit en entier après chaque mutation.
//!
//! ## Écriture atomique
//!
//! Le document est sérialisé dans `tracks_db.json.tmp`, puis renommé par-dessus
//! l'ancien. Un arrêt brutal laisse donc soit l'ancienne, soit la nouvelle version.
//!
//! ## Réconciliation
//!
//! Au démarrage, [`TrackStore::reconcile`] aligne le catalogue sur le contenu
//! réel du répertoire :
//!
//! 1. chargement du document (catalogue vide si absent ou corrompu) ;
//! 2. adoption des fichiers orphelins (nouvelle piste `ready`, source `local`) ;
//! 3. suppression des pistes `ready` dont le fichier a disparu ;
//! 4. passage en `error` des téléchargements interrompus par un arrêt.
//!
//! Deux réconciliations successives sans changement sur le disque produisent
//! le même catalogue.

use crate::error::Result;
use crate::track::{Track, TrackStatus};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Nom par défaut du document de catalogue
pub const DEFAULT_DB_FILE: &str = "tracks_db.json";

/// Diagnostic posé sur un téléchargement resté `downloading` au redémarrage
pub const INTERRUPTED_DIAGNOSTIC: &str = "Download interrupted by a server restart";

const ID_LEN: usize = 8;
const TMP_SUFFIX: &str = ".tmp";

/// Bilan d'une réconciliation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Nombre d'entrées lues dans le document
    pub loaded: usize,
    /// Identifiants créés pour des fichiers orphelins
    pub adopted: Vec<String>,
    /// Identifiants supprimés faute de fichier
    pub pruned: Vec<String>,
    /// Identifiants de téléchargements interrompus
    pub interrupted: Vec<String>,
}

#[derive(Default)]
struct Catalog {
    tracks: IndexMap<String, Track>,
    // identifiants distribués mais pas encore insérés (upload en cours)
    reserved: HashSet<String>,
}

impl Catalog {
    fn is_taken(&self, id: &str) -> bool {
        self.tracks.contains_key(id) || self.reserved.contains(id)
    }

    fn generate_id(&self) -> String {
        loop {
            let id: String = Uuid::new_v4().simple().to_string().chars().take(ID_LEN).collect();
            if !self.is_taken(&id) {
                return id;
            }
            debug!(track_id = %id, "Track id collision, regenerating");
        }
    }
}

/// Catalogue des pistes, partagé entre les handlers HTTP et les workers
pub struct TrackStore {
    tracks_dir: PathBuf,
    db_path: PathBuf,
    catalog: Mutex<Catalog>,
}

impl TrackStore {
    /// Crée un catalogue vide adossé à `tracks_dir/db_file`, sans rien lire
    pub fn new(tracks_dir: impl Into<PathBuf>, db_file: &str) -> Self {
        let tracks_dir = tracks_dir.into();
        let db_path = tracks_dir.join(db_file);
        Self {
            tracks_dir,
            db_path,
            catalog: Mutex::new(Catalog::default()),
        }
    }

    /// Ouvre le catalogue : crée le répertoire si besoin puis réconcilie
    pub async fn open(tracks_dir: impl Into<PathBuf>, db_file: &str) -> Result<Self> {
        let store = Self::new(tracks_dir, db_file);
        tokio::fs::create_dir_all(&store.tracks_dir).await?;
        let report = store.reconcile().await?;
        info!(
            "📚 Track catalog ready: {} loaded, {} adopted, {} pruned, {} interrupted",
            report.loaded,
            report.adopted.len(),
            report.pruned.len(),
            report.interrupted.len()
        );
        Ok(store)
    }

    pub fn tracks_dir(&self) -> &Path {
        &self.tracks_dir
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.db_path.as_os_str().to_owned();
        name.push(TMP_SUFFIX);
        PathBuf::from(name)
    }

    /// Chemin d'un fichier du répertoire des pistes
    ///
    /// Seul le dernier composant de `filename` est retenu.
    pub fn file_path(&self, filename: &str) -> PathBuf {
        match Path::new(filename).file_name() {
            Some(name) => self.tracks_dir.join(name),
            None => self.tracks_dir.join(filename),
        }
    }

    /// Le fichier fait-il partie du catalogue lui-même (document ou temporaire) ?
    fn is_catalog_file(&self, name: &str) -> bool {
        let db_name = self
            .db_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        name == db_name || name == format!("{}{}", db_name, TMP_SUFFIX)
    }

    /// Charge le document en mémoire et retourne le nombre d'entrées
    ///
    /// Un document absent ou illisible donne un catalogue vide : cette
    /// opération n'échoue jamais. Une entrée illisible est ignorée sans
    /// perdre les autres.
    pub async fn load(&self) -> usize {
        let entries = match tokio::fs::read(&self.db_path).await {
            Ok(data) => match serde_json::from_slice::<IndexMap<String, Value>>(&data) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %self.db_path.display(), "Corrupt track catalog, starting empty: {}", e);
                    IndexMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => IndexMap::new(),
            Err(e) => {
                warn!(path = %self.db_path.display(), "Cannot read track catalog, starting empty: {}", e);
                IndexMap::new()
            }
        };

        // la clé du document fait foi pour l'identifiant
        let tracks: IndexMap<String, Track> = entries
            .into_iter()
            .filter_map(|(id, entry)| match serde_json::from_value::<Track>(entry) {
                Ok(mut track) => {
                    track.id = id.clone();
                    Some((id, track))
                }
                Err(e) => {
                    warn!(track_id = %id, "Dropping unreadable catalog entry: {}", e);
                    None
                }
            })
            .collect();

        let count = tracks.len();
        self.catalog.lock().await.tracks = tracks;
        count
    }

    /// Réécrit le document complet
    pub async fn save(&self) -> Result<()> {
        let catalog = self.catalog.lock().await;
        self.write_document(&catalog).await
    }

    async fn write_document(&self, catalog: &Catalog) -> Result<()> {
        let data = serde_json::to_vec_pretty(&catalog.tracks)?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, &self.db_path).await?;
        debug!(path = %self.db_path.display(), tracks = catalog.tracks.len(), "Track catalog saved");
        Ok(())
    }

    /// Aligne le catalogue sur le contenu du répertoire puis le sauvegarde
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport {
            loaded: self.load().await,
            ..Default::default()
        };

        let mut catalog = self.catalog.lock().await;

        // Adoption des orphelins
        let known: HashSet<String> = catalog
            .tracks
            .values()
            .filter(|t| !t.filename.is_empty())
            .map(|t| t.filename.clone())
            .collect();

        for name in self.list_files().await? {
            if self.is_catalog_file(&name) || known.contains(&name) {
                continue;
            }
            let id = catalog.generate_id();
            info!(track_id = %id, file = %name, "Adopting orphan audio file");
            catalog.tracks.insert(id.clone(), Track::orphan(id.clone(), &name));
            report.adopted.push(id);
        }

        // Suppression des entrées sans fichier
        let mut dangling = Vec::new();
        for (id, track) in &catalog.tracks {
            if track.status == TrackStatus::Ready && !self.backing_file_exists(track).await {
                dangling.push(id.clone());
            }
        }
        for id in &dangling {
            info!(track_id = %id, "Pruning track whose file has vanished");
            catalog.tracks.shift_remove(id);
        }
        report.pruned = dangling;

        // Téléchargements interrompus : aucun worker ne les reprendra
        for (id, track) in catalog.tracks.iter_mut() {
            if track.status == TrackStatus::Downloading {
                warn!(track_id = %id, "Marking interrupted download as failed");
                track.fail(INTERRUPTED_DIAGNOSTIC);
                report.interrupted.push(id.clone());
            }
        }

        self.write_document(&catalog).await?;
        Ok(report)
    }

    /// Noms des fichiers réguliers du répertoire, triés
    async fn list_files(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.tracks_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => warn!("Ignoring non UTF-8 file name {:?}", name),
            }
        }
        names.sort();
        Ok(names)
    }

    /// Le fichier d'une piste existe-t-il sur le disque ?
    pub async fn backing_file_exists(&self, track: &Track) -> bool {
        if track.filename.is_empty() {
            return false;
        }
        tokio::fs::metadata(self.file_path(&track.filename))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    pub async fn get(&self, id: &str) -> Option<Track> {
        self.catalog.lock().await.tracks.get(id).cloned()
    }

    /// Toutes les pistes, quel que soit leur état, dans l'ordre d'insertion
    pub async fn list(&self) -> Vec<Track> {
        self.catalog.lock().await.tracks.values().cloned().collect()
    }

    /// Les seules pistes jouables
    pub async fn list_ready(&self) -> Vec<Track> {
        self.catalog
            .lock()
            .await
            .tracks
            .values()
            .filter(|t| t.is_ready())
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.catalog.lock().await.tracks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Réserve un identifiant libre
    ///
    /// L'identifiant reste réservé jusqu'à [`insert`](Self::insert) ou
    /// [`release`](Self::release).
    pub async fn reserve_id(&self) -> String {
        let mut catalog = self.catalog.lock().await;
        let id = catalog.generate_id();
        catalog.reserved.insert(id.clone());
        id
    }

    /// Libère un identifiant réservé qui ne sera pas utilisé
    pub async fn release(&self, id: &str) {
        self.catalog.lock().await.reserved.remove(id);
    }

    /// Insère (ou remplace) une piste puis sauvegarde
    pub async fn insert(&self, track: Track) -> Result<Track> {
        let mut catalog = self.catalog.lock().await;
        catalog.reserved.remove(&track.id);
        catalog.tracks.insert(track.id.clone(), track.clone());
        self.write_document(&catalog).await?;
        Ok(track)
    }

    /// Crée une piste avec un identifiant neuf puis sauvegarde
    pub async fn create<F>(&self, build: F) -> Result<Track>
    where
        F: FnOnce(String) -> Track,
    {
        let mut catalog = self.catalog.lock().await;
        let track = build(catalog.generate_id());
        catalog.tracks.insert(track.id.clone(), track.clone());
        self.write_document(&catalog).await?;
        Ok(track)
    }

    /// Modifie une piste puis sauvegarde
    ///
    /// Retourne `None` si la piste n'existe plus (supprimée entre-temps).
    pub async fn update<F>(&self, id: &str, apply: F) -> Result<Option<Track>>
    where
        F: FnOnce(&mut Track),
    {
        let mut catalog = self.catalog.lock().await;
        let Some(track) = catalog.tracks.get_mut(id) else {
            return Ok(None);
        };
        apply(track);
        let updated = track.clone();
        self.write_document(&catalog).await?;
        Ok(Some(updated))
    }

    /// Supprime une piste et son fichier puis sauvegarde
    pub async fn remove(&self, id: &str) -> Result<Option<Track>> {
        let mut catalog = self.catalog.lock().await;
        let Some(track) = catalog.tracks.get(id).cloned() else {
            return Ok(None);
        };

        if !track.filename.is_empty() {
            let path = self.file_path(&track.filename);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(track_id = %id, path = %path.display(), "Audio file deleted"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        catalog.tracks.shift_remove(id);
        self.write_document(&catalog).await?;
        Ok(Some(track))
    }
}
