use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use log::{LevelFilter, debug, info};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

mod logging;

pub use logging::{DEFAULT_LOG_LEVEL, init_logging, parse_level};

#[derive(Debug, Error)]
pub enum MrpError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("no run document on stdin")]
    EmptyInput,
    #[error("no file registered under model.files.{0}")]
    MissingFile(String),
    #[error("failed to install logger: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, MrpError>;

/// A file written by [`Environment::write`] or one of its helpers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Written {
    /// Destination path, or `None` when the payload went to stdout.
    pub path: Option<PathBuf>,
    pub sha256: String,
}

/// The parsed run document: `{ input, model: { files }, output }`.
pub struct Environment<I = ()> {
    input_json: serde_json::Map<String, Value>,
    pub input: I,
    pub log_level: LevelFilter,
    pub files: HashMap<String, PathBuf>,
    output: Value,
}

impl Environment {
    pub fn from_json(data: Value) -> Self {
        let mut input_json = data
            .get("input")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();

        let log_level = input_json
            .remove("log_level")
            .and_then(|v| v.as_str().map(parse_level))
            .unwrap_or(DEFAULT_LOG_LEVEL);

        let files = data
            .get("model")
            .and_then(|m| m.get("files"))
            .and_then(|f| f.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), PathBuf::from(s))))
                    .collect()
            })
            .unwrap_or_default();

        let output = data.get("output").cloned().unwrap_or(Value::Null);

        Self {
            input_json,
            input: (),
            log_level,
            files,
            output,
        }
    }

    /// Same document shape as [`Environment::from_json`], written as TOML.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let document: toml::Value = toml::from_str(raw)?;
        Ok(Self::from_json(serde_json::to_value(document)?))
    }

    /// JSON documents start with `{`; anything else is read as TOML.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MrpError::EmptyInput);
        }
        if trimmed.starts_with('{') {
            Ok(Self::from_json(serde_json::from_str(trimmed)?))
        } else {
            Self::from_toml(trimmed)
        }
    }

    pub fn from_stdin() -> Result<Self> {
        let mut raw = String::new();
        io::stdin().read_to_string(&mut raw)?;
        Self::parse(&raw)
    }

    pub fn with_input_type<I: DeserializeOwned>(self) -> Result<Environment<I>> {
        let input = serde_json::from_value(Value::Object(self.input_json.clone()))?;
        Ok(Environment {
            input_json: self.input_json,
            input,
            log_level: self.log_level,
            files: self.files,
            output: self.output,
        })
    }
}

impl<I: DeserializeOwned> Environment<I> {
    pub fn load() -> Result<Self> {
        Environment::<()>::from_stdin()?.with_input_type::<I>()
    }
}

impl<I> Environment<I> {
    pub fn input_json(&self) -> &serde_json::Map<String, Value> {
        &self.input_json
    }

    pub fn file(&self, key: &str) -> Result<&Path> {
        self.files
            .get(key)
            .map(PathBuf::as_path)
            .ok_or_else(|| MrpError::MissingFile(key.to_string()))
    }

    pub fn has_file(&self, key: &str) -> bool {
        self.files.contains_key(key)
    }

    pub fn read_json_file<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let path = self.file(key)?;
        debug!("reading {key} from {}", path.display());
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn open_file(&self, key: &str) -> Result<fs::File> {
        let path = self.file(key)?;
        debug!("opening {key} at {}", path.display());
        Ok(fs::File::open(path)?)
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        let output = &self.output;

        // Check flat output
        if output.get("spec").and_then(|v| v.as_str()) == Some("filesystem") {
            return output
                .get("dir")
                .and_then(|v| v.as_str())
                .map(PathBuf::from);
        }

        // Check profiled output, preferring the default profile
        let profile = output
            .get("profile")
            .and_then(|v| v.as_object())
            .and_then(|profiles| profiles.get("default").or_else(|| profiles.values().next()))?;
        if profile.get("spec").and_then(|v| v.as_str()) != Some("filesystem") {
            return None;
        }
        profile.get("dir").and_then(|v| v.as_str()).map(PathBuf::from)
    }

    pub fn write(&self, filename: &str, data: &[u8]) -> Result<Written> {
        let sha256 = digest(data);
        let path = match self.output_dir() {
            Some(dir) => {
                fs::create_dir_all(&dir)?;
                let path = dir.join(filename);
                fs::write(&path, data)?;
                Some(path)
            }
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(data)?;
                stdout.flush()?;
                None
            }
        };
        info!("wrote {filename} ({} bytes, sha256 {sha256})", data.len());
        Ok(Written { path, sha256 })
    }

    pub fn write_csv<S: Serialize>(&self, filename: &str, rows: &[S]) -> Result<Written> {
        self.write(filename, &csv_bytes(rows)?)
    }

    pub fn write_json<S: Serialize + ?Sized>(&self, filename: &str, value: &S) -> Result<Written> {
        self.write(filename, &serde_json::to_vec_pretty(value)?)
    }
}

/// Serializes `rows` as CSV with a header row taken from the field names.
pub fn csv_bytes<S: Serialize>(rows: &[S]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.into_inner()
        .map_err(|e| MrpError::Io(io::Error::other(e.to_string())))
}

pub fn digest(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
