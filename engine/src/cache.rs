use crate::matrix::{SimilarityMatrix, TermMatrix};
use anyhow::{bail, Result};
use bincode;
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_items: usize,
    pub num_terms: usize,
    pub fingerprint: String,
    pub created_at: String,
    pub version: u32,
}

pub struct ArtifactPaths {
    pub root: PathBuf,
}

impl ArtifactPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn term_matrix(&self) -> PathBuf { self.root.join("term_matrix.bin") }
    pub fn similarity(&self) -> PathBuf { self.root.join("similarity.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let mut f = File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(buf)
}

pub fn save_term_matrix(paths: &ArtifactPaths, terms: &TermMatrix) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_atomic(&paths.term_matrix(), &bincode::serialize(terms)?)
}

pub fn load_term_matrix(paths: &ArtifactPaths) -> Result<TermMatrix> {
    Ok(bincode::deserialize(&read_bytes(&paths.term_matrix())?)?)
}

pub fn save_similarity(paths: &ArtifactPaths, sim: &SimilarityMatrix) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_atomic(&paths.similarity(), &bincode::serialize(sim)?)
}

pub fn load_similarity(paths: &ArtifactPaths) -> Result<SimilarityMatrix> {
    Ok(bincode::deserialize(&read_bytes(&paths.similarity())?)?)
}

pub fn save_meta(paths: &ArtifactPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_atomic(&paths.meta(), serde_json::to_string_pretty(meta)?.as_bytes())
}

pub fn load_meta(paths: &ArtifactPaths) -> Result<MetaFile> {
    let mut buf = String::new();
    File::open(paths.meta())?.read_to_string(&mut buf)?;
    Ok(serde_json::from_str(&buf)?)
}

/// On-disk store for the matrices of one corpus snapshot, keyed by corpus fingerprint.
pub struct ArtifactCache {
    paths: ArtifactPaths,
}

impl ArtifactCache {
    pub fn new<P: AsRef<Path>>(root: P) -> Self { Self { paths: ArtifactPaths::new(root) } }

    pub fn paths(&self) -> &ArtifactPaths { &self.paths }

    /// Previously stored matrices for `fingerprint`. Any failure is logged and reported as a miss.
    pub fn load(&self, fingerprint: &str) -> Option<(TermMatrix, SimilarityMatrix)> {
        match self.try_load(fingerprint) {
            Ok(pair) => {
                tracing::info!(root = %self.paths.root.display(), items = pair.0.num_rows(), "loaded cached artifacts");
                Some(pair)
            }
            Err(e) => {
                tracing::warn!(root = %self.paths.root.display(), error = %e, "artifact cache miss");
                None
            }
        }
    }

    fn try_load(&self, fingerprint: &str) -> Result<(TermMatrix, SimilarityMatrix)> {
        let meta = load_meta(&self.paths)?;
        if meta.version != FORMAT_VERSION {
            bail!("artifact format version {} != {}", meta.version, FORMAT_VERSION);
        }
        if meta.fingerprint != fingerprint {
            bail!("artifacts were built from a different catalog ({})", meta.fingerprint);
        }
        let terms = load_term_matrix(&self.paths)?;
        let sim = load_similarity(&self.paths)?;
        if !sim.is_well_formed() || terms.num_rows() != sim.len() || sim.len() != meta.num_items {
            bail!("artifact dimensions disagree");
        }
        Ok((terms, sim))
    }

    /// Persist the matrices; metadata is written last so a partial store never validates.
    pub fn store(&self, terms: &TermMatrix, sim: &SimilarityMatrix, fingerprint: &str) -> Result<()> {
        // drop stale metadata first so a crash mid-store reads as a miss
        if self.paths.meta().exists() {
            fs::remove_file(self.paths.meta())?;
        }
        save_term_matrix(&self.paths, terms)?;
        save_similarity(&self.paths, sim)?;
        let meta = MetaFile {
            num_items: sim.len(),
            num_terms: terms.num_terms(),
            fingerprint: fingerprint.to_string(),
            created_at: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "".into()),
            version: FORMAT_VERSION,
        };
        save_meta(&self.paths, &meta)?;
        tracing::info!(root = %self.paths.root.display(), items = meta.num_items, "stored artifacts");
        Ok(())
    }
}
