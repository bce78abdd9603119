//! Configuration loaded from a YAML (or JSON) file.
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chunking::ChunkConfig;
use crate::embedding::{EmbeddingError, StubEmbedder};
use crate::ocr::{
    CommandSpacing, LanguageProfile, OcrConsensusEngine, OcrError, Preprocessor,
    RecognitionProvider, RecognitionSettings, ScriptBoundarySpacing, SpacingCorrector,
};
use crate::pipeline::{IngestMode, IngestOptions};
use crate::sink::{FlatVectorSink, JsonVectorSink, Metric, SinkError, VectorSink};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "RAG_INGEST_CONFIG";

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "./configs/config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown vector_sink type: {0} (expected json or flat)")]
    UnknownSink(String),

    #[error("Vector sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Embedder error: {0}")]
    Embedder(#[from] EmbeddingError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub dpi: u32,
    /// Pages whose mean OCR confidence falls below this use the vision fallback.
    pub ocr_conf_threshold: f32,
    /// Pages processed concurrently.
    pub workers: usize,
    pub mode: IngestMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            ocr_conf_threshold: 0.75,
            workers: 4,
            mode: IngestMode::Ocr,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacingConfig {
    /// External corrector: program followed by its arguments. Reads the line
    /// on stdin and writes the corrected line on stdout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub provider: String,
    /// Language profiles; the first is the mixed profile that wins merge ties.
    pub profiles: Vec<String>,
    pub psm: u8,
    pub oem: u8,
    pub tile_size: u32,
    pub block_radius: u32,
    pub spacing: SpacingConfig,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            provider: "tesseract".to_string(),
            profiles: vec!["kor+eng".to_string(), "kor".to_string()],
            psm: 6,
            oem: 1,
            tile_size: 128,
            block_radius: 15,
            spacing: SpacingConfig::default(),
        }
    }
}

impl OcrConfig {
    pub fn settings(&self) -> RecognitionSettings {
        RecognitionSettings {
            psm: self.psm,
            oem: self.oem,
        }
    }

    pub fn language_profiles(&self) -> Vec<LanguageProfile> {
        self.profiles.iter().map(LanguageProfile::new).collect()
    }

    /// Build the spacing corrector once for the whole run.
    pub fn spacing_corrector(&self) -> Result<Arc<dyn SpacingCorrector>, OcrError> {
        match self.spacing.command.as_deref() {
            Some([program, args @ ..]) => Ok(Arc::new(CommandSpacing::new(
                program.clone(),
                args.to_vec(),
            )?)),
            Some([]) => Err(OcrError::UnsupportedConfiguration(
                "ocr.spacing.command is empty".to_string(),
            )),
            None => Ok(Arc::new(ScriptBoundarySpacing)),
        }
    }

    /// Resolve the provider and build the consensus engine.
    ///
    /// Fails immediately when the recognition binary is not installed.
    pub fn build_engine(&self) -> Result<OcrConsensusEngine, OcrError> {
        let provider = RecognitionProvider::parse(&self.provider)?;
        let engine = provider.build(self.settings())?;
        OcrConsensusEngine::new(
            engine,
            self.spacing_corrector()?,
            Preprocessor::new(self.tile_size, self.block_radius),
            self.language_profiles(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    pub model: String,
    pub dim: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            model: "bge-m3-ko".to_string(),
            dim: 1024,
        }
    }
}

impl EmbedderConfig {
    pub fn build(&self) -> Result<StubEmbedder, ConfigError> {
        Ok(StubEmbedder::new(self.model.clone(), self.dim)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatSinkConfig {
    pub index_path: PathBuf,
    /// `L2` or `IP`.
    pub metric: String,
}

impl Default for FlatSinkConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("./data/index.flat"),
            metric: "L2".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSinkConfig {
    /// `json` or `flat`.
    #[serde(rename = "type")]
    pub sink_type: String,
    pub json_path: PathBuf,
    pub flat: FlatSinkConfig,
    /// Separate collection for `vision_infer` chunks. Unset means vision
    /// chunks are not indexed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision_path: Option<PathBuf>,
}

impl Default for VectorSinkConfig {
    fn default() -> Self {
        Self {
            sink_type: "json".to_string(),
            json_path: PathBuf::from("./data/index.json"),
            flat: FlatSinkConfig::default(),
            vision_path: Some(PathBuf::from("./data/vision_index.json")),
        }
    }
}

impl VectorSinkConfig {
    /// Open the primary collection.
    pub fn open(&self) -> Result<Box<dyn VectorSink>, ConfigError> {
        match self.sink_type.as_str() {
            "json" => Ok(Box::new(JsonVectorSink::open(&self.json_path)?)),
            "flat" => {
                let metric = Metric::parse(&self.flat.metric)?;
                Ok(Box::new(FlatVectorSink::open(&self.flat.index_path, metric)?))
            }
            other => Err(ConfigError::UnknownSink(other.to_string())),
        }
    }

    /// Open the vision collection, if configured.
    pub fn open_vision(&self) -> Result<Option<Box<dyn VectorSink>>, ConfigError> {
        match &self.vision_path {
            Some(path) => Ok(Some(Box::new(JsonVectorSink::open(path)?))),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub ocr: OcrConfig,
    pub chunk: ChunkConfig,
    pub embedder: EmbedderConfig,
    pub vector_sink: VectorSinkConfig,

    /// File this configuration was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load from `path` when given, else from the default location if it
    /// exists, else defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_from_path(path).await;
        }
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if tokio::fs::try_exists(default_path).await.unwrap_or(false) {
            return Self::load_from_path(default_path).await;
        }
        tracing::debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    /// Load from a specific file. `.json` files are parsed as JSON, anything
    /// else as YAML.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("yaml");
        let mut config = match ext {
            "json" => Self::from_json(&contents)?,
            _ => Self::from_yaml(&contents)?,
        };
        config.source_path = Some(path.to_path_buf());
        config.validate()?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.dpi == 0 {
            return Err(ConfigError::Invalid("pipeline.dpi must be positive".to_string()));
        }
        if self.pipeline.workers == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.workers must be at least 1".to_string(),
            ));
        }
        if self.ocr.profiles.is_empty() {
            return Err(ConfigError::Invalid(
                "ocr.profiles needs at least one language profile".to_string(),
            ));
        }
        if self.chunk.min_chars > self.chunk.max_chars {
            return Err(ConfigError::Invalid(format!(
                "chunk.min_chars ({}) exceeds chunk.max_chars ({})",
                self.chunk.min_chars, self.chunk.max_chars
            )));
        }
        Ok(())
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            dpi: self.pipeline.dpi,
            ocr_conf_threshold: self.pipeline.ocr_conf_threshold,
            workers: self.pipeline.workers,
            chunk: self.chunk,
            pages: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_yaml_is_default() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.pipeline.dpi, 300);
        assert_eq!(config.ocr.profiles, vec!["kor+eng", "kor"]);
        assert_eq!(config.chunk.max_chars, 1400);
        assert_eq!(config.embedder.dim, 1024);
        assert_eq!(config.vector_sink.sink_type, "json");
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = r#"
pipeline:
  ocr_conf_threshold: 0.6
  mode: pdf_text
chunk:
  max_chars: 900
vector_sink:
  type: flat
  flat:
    metric: IP
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.pipeline.ocr_conf_threshold, 0.6);
        assert_eq!(config.pipeline.mode, IngestMode::PdfText);
        assert_eq!(config.pipeline.workers, 4);
        assert_eq!(config.chunk.max_chars, 900);
        assert_eq!(config.chunk.min_chars, 800);
        assert_eq!(config.vector_sink.sink_type, "flat");
        assert_eq!(config.vector_sink.flat.metric, "IP");
        assert_eq!(config.vector_sink.flat.index_path, PathBuf::from("./data/index.flat"));
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let config = Config::from_yaml("chunk:\n  max_chars: 100\n  min_chars: 200\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_sink_type() {
        let mut config = Config::default();
        config.vector_sink.sink_type = "milvus".to_string();
        assert!(matches!(
            config.vector_sink.open(),
            Err(ConfigError::UnknownSink(t)) if t == "milvus"
        ));
    }

    #[test]
    fn test_unknown_provider_fails_at_startup() {
        let ocr = OcrConfig {
            provider: "paddle".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ocr.build_engine(),
            Err(OcrError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn test_empty_spacing_command_is_rejected() {
        let ocr = OcrConfig {
            spacing: SpacingConfig {
                command: Some(Vec::new()),
            },
            ..Default::default()
        };
        assert!(ocr.spacing_corrector().is_err());
    }

    #[tokio::test]
    async fn test_load_from_path_and_open_sinks() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        let yaml = format!(
            "vector_sink:\n  json_path: {}\n  vision_path: {}\n",
            temp.path().join("index.json").display(),
            temp.path().join("vision.json").display()
        );
        std::fs::write(&path, yaml).unwrap();

        let config = Config::load(Some(path.as_path())).await.unwrap();
        assert_eq!(config.source_path.as_deref(), Some(path.as_path()));
        let sink = config.vector_sink.open().unwrap();
        assert_eq!(sink.name(), "json");
        assert!(config.vector_sink.open_vision().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let result = Config::load(Some(Path::new("/nonexistent/config.yaml"))).await;
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
