use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const MIN_YEAR: i32 = 1870;
pub const MAX_YEAR: i32 = 2100;

/// A validated catalog record. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub title: String,
    pub year: i32,
    pub genres: Vec<String>,
    pub rating: f32,
    pub votes: u64,
}

impl CatalogItem {
    pub fn new(title: impl Into<String>, year: i32, genres: &[&str], rating: f32, votes: u64) -> Self {
        Self { title: title.into(), year, genres: genres.iter().map(|g| g.to_string()).collect(), rating, votes }
    }
}

/// Genres as they appear on the wire: either a list or an IMDb-style `Action|Drama` string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GenreField {
    List(Vec<String>),
    Joined(String),
}

impl GenreField {
    fn into_list(self) -> Vec<String> {
        let raw: Vec<String> = match self {
            GenreField::List(v) => v,
            GenreField::Joined(s) => s.split(['|', ',']).map(|g| g.to_string()).collect(),
        };
        let mut out: Vec<String> = Vec::with_capacity(raw.len());
        for g in raw {
            let g = g.trim();
            // IMDb uses \N for missing values
            if g.is_empty() || g == "\\N" { continue; }
            if !out.iter().any(|seen| seen.eq_ignore_ascii_case(g)) {
                out.push(g.to_string());
            }
        }
        out
    }
}

/// Unvalidated record read from a catalog file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCatalogItem {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub genres: Option<GenreField>,
    pub rating: Option<f32>,
    pub votes: Option<u64>,
}

impl RawCatalogItem {
    pub fn validate(self, index: usize) -> EngineResult<CatalogItem> {
        let title = self.title.map(|t| t.trim().to_string()).unwrap_or_default();
        if title.is_empty() {
            return Err(EngineError::invalid(index, "title", "is missing or blank"));
        }
        let year = self.year.ok_or_else(|| EngineError::invalid(index, "year", "is missing"))?;
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(EngineError::invalid(index, "year", format!("{year} is outside {MIN_YEAR}..={MAX_YEAR}")));
        }
        let rating = self.rating.ok_or_else(|| EngineError::invalid(index, "rating", "is missing"))?;
        if !rating.is_finite() || !(0.0..=10.0).contains(&rating) {
            return Err(EngineError::invalid(index, "rating", format!("{rating} is outside [0, 10]")));
        }
        let votes = self.votes.ok_or_else(|| EngineError::invalid(index, "votes", "is missing"))?;
        let genres = self.genres.ok_or_else(|| EngineError::invalid(index, "genres", "is missing"))?.into_list();
        Ok(CatalogItem { title, year, genres, rating, votes })
    }
}

pub fn validate_all(raw: Vec<RawCatalogItem>) -> EngineResult<Vec<CatalogItem>> {
    raw.into_iter().enumerate().map(|(i, r)| r.validate(i)).collect()
}

/// Load a catalog from a `.json`/`.jsonl` file or from every such file under a directory.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> EngineResult<Vec<CatalogItem>> {
    let path = path.as_ref();
    let mut files: Vec<PathBuf> = Vec::new();
    if path.is_dir() {
        for entry in WalkDir::new(path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(extension(p), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else {
        files.push(path.to_path_buf());
    }

    let mut raw = Vec::new();
    for file in files {
        if extension(&file) == Some("jsonl") {
            read_jsonl(&file, &mut raw)?;
        } else {
            read_json(&file, &mut raw)?;
        }
    }
    let items = validate_all(raw)?;
    tracing::info!(items = items.len(), path = %path.display(), "catalog loaded");
    Ok(items)
}

fn extension(p: &Path) -> Option<&str> { p.extension().and_then(|s| s.to_str()) }

fn read_jsonl(file: &Path, out: &mut Vec<RawCatalogItem>) -> EngineResult<()> {
    let reader = BufReader::new(File::open(file)?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        out.push(serde_json::from_str(&line)?);
    }
    Ok(())
}

fn read_json(file: &Path, out: &mut Vec<RawCatalogItem>) -> EngineResult<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                out.push(serde_json::from_value(v)?);
            }
        }
        serde_json::Value::Object(_) => out.push(serde_json::from_value(json)?),
        _ => return Err(EngineError::invalid(out.len(), "document", "top-level JSON must be an object or an array")),
    }
    Ok(())
}

/// SHA-1 over a canonical encoding of the corpus, in corpus order.
pub fn corpus_fingerprint(items: &[CatalogItem]) -> String {
    let mut hasher = Sha1::new();
    hasher.update((items.len() as u64).to_le_bytes());
    for item in items {
        hasher.update((item.title.len() as u64).to_le_bytes());
        hasher.update(item.title.as_bytes());
        hasher.update(item.year.to_le_bytes());
        hasher.update((item.genres.len() as u64).to_le_bytes());
        for g in &item.genres {
            hasher.update((g.len() as u64).to_le_bytes());
            hasher.update(g.as_bytes());
        }
        hasher.update(item.rating.to_bits().to_le_bytes());
        hasher.update(item.votes.to_le_bytes());
    }
    format!("{:x}", hasher.finalize())
}
