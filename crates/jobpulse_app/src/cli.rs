use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use jobpulse_core::PipelineConfig;
use log::LevelFilter;
use pulse_logging::{pulse_info, LogDestination};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "jobpulse")]
#[command(version, about = "Scrape job boards and rank skill, title and location trends")]
pub struct Cli {
    /// RON file with pipeline settings; flags below override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Search terms
    #[arg(long)]
    pub query: Option<String>,

    /// Job board to search (linkedin, remoteok); repeat for several
    #[arg(long = "source", value_name = "NAME")]
    pub sources: Vec<String>,

    /// Location filter for boards that support one
    #[arg(long)]
    pub location: Option<String>,

    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub max_results: Option<i64>,

    /// Entries per trend table
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub top_n: Option<i64>,

    /// Where jobs.csv and manifest.json are written
    #[arg(long, value_name = "DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Print the report without writing export files
    #[arg(long)]
    pub no_export: bool,

    /// Run all sources at the same time
    #[arg(long)]
    pub concurrent: bool,

    #[arg(long, value_enum, default_value_t = LogTarget::File)]
    pub log: LogTarget,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    /// Config file (or defaults) with command-line overrides applied.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => PipelineConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut PipelineConfig) {
        if let Some(query) = &self.query {
            config.query = query.clone();
        }
        if !self.sources.is_empty() {
            config.sources = self.sources.clone();
        }
        if let Some(location) = &self.location {
            config.location = location.clone();
        }
        if let Some(max_results) = self.max_results {
            config.max_results_per_source = max_results;
        }
        if let Some(top_n) = self.top_n {
            config.top_n = top_n;
        }
        if self.concurrent {
            config.concurrent = true;
        }
    }
}

pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let config: PipelineConfig = ron::from_str(&content)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    pulse_info!("Loaded pipeline config from {:?}", path);
    Ok(config)
}
