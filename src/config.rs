use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryConfig {
    /// Root of the directory tree that holds the model folders.
    pub root_path: PathBuf,
}

/// Scanner defaults. The first three fields only seed the settings store;
/// a value saved under the matching settings key always wins.
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    pub ignored_folder_names: String,
    pub min_depth: i64,
    pub excluded_folders: String,
    pub model_search_depth: usize,
    pub thumbnail_search_depth: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub tick_secs: u64,
    pub schedule_hour: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub library: LibraryConfig,
    pub scanner: ScannerConfig,
    pub scheduler: SchedulerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        let defaults: &str = include_str!("../config/default.toml");
        match ::config::Config::builder()
            .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
            .build()
            .and_then(|cfg| cfg.try_deserialize())
        {
            Ok(app_cfg) => app_cfg,
            Err(e) => {
                eprintln!("FATAL: Failed to load embedded default config: {}", e);
                panic!("Failed to load embedded default config: {}", e);
            }
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        // Mirror defaults from config/default.toml
        Self {
            ignored_folder_names: "stl,obj,3mf,lys,base,bases,part,parts,piece,pieces,supported,unsupported,presupported,pre-supported,painted,unpainted,scaled,files".to_string(),
            min_depth: 2,
            excluded_folders: String::new(),
            model_search_depth: 5,
            thumbnail_search_depth: 3,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { enabled: true, tick_secs: 60, schedule_hour: 3 }
    }
}

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let defaults: &str = include_str!("../config/default.toml");
    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
        // Optional local file: modellwald.toml (in CWD)
        .add_source(::config::File::with_name("modellwald").required(false));

    if let Ok(custom_path) = std::env::var("MODELLWALD_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(::config::Environment::with_prefix("MODELLWALD").separator("__"));

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // Server
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }

    // Library
    if cfg.library.root_path.as_os_str().is_empty() {
        return Err(anyhow::anyhow!("library.root_path must not be empty"));
    }

    // Scanner
    if cfg.scanner.min_depth < 0 {
        return Err(anyhow::anyhow!("scanner.min_depth must be >= 0"));
    }
    if cfg.scanner.model_search_depth == 0 || cfg.scanner.model_search_depth > 32 {
        return Err(anyhow::anyhow!("scanner.model_search_depth must be in 1..=32"));
    }
    if cfg.scanner.thumbnail_search_depth == 0 || cfg.scanner.thumbnail_search_depth > 32 {
        return Err(anyhow::anyhow!("scanner.thumbnail_search_depth must be in 1..=32"));
    }

    // Scheduler
    if cfg.scheduler.tick_secs == 0 {
        return Err(anyhow::anyhow!("scheduler.tick_secs must be > 0"));
    }
    if cfg.scheduler.schedule_hour > 23 {
        return Err(anyhow::anyhow!("scheduler.schedule_hour must be in 0..=23"));
    }

    Ok(())
}

pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    if let Some(path) = url.strip_prefix("sqlite://") {
        // sqlite:///C:/... -> C:/...
        #[cfg(windows)]
        let path = {
            let bytes = path.as_bytes();
            if bytes.len() >= 3 && bytes[0] == b'/' && bytes[2] == b':' && bytes[1].is_ascii_alphabetic() {
                &path[1..]
            } else {
                path
            }
        };
        let path = path.split('?').next().unwrap_or(path);
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}
