use std::{fs, num::NonZeroUsize, path::PathBuf, result};

use anyhow::Result;
use log::{debug, info};
use serde::Deserialize;

use crate::{
    error::ConfigError,
    peer::{peer_set, Peer},
    placement::Policy,
};

const TIMEOUT_DEFAULT: u64 = 10000; // in ms
const PING_COUNT_DEFAULT: usize = 8;
const RETRIES_DEFAULT: u32 = 0;

#[derive(Clone, Deserialize)]
pub struct UploaderSection {
    #[serde(default)]
    pub base_dir: String,

    #[serde(default)]
    pub block_size: i64,

    #[serde(default)]
    pub policy: String,
}

#[derive(Clone, Deserialize)]
pub struct DownloaderSection {
    #[serde(default)]
    pub base_dir: String,

    #[serde(default)]
    pub block_size: i64,
}

#[derive(Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub peers: Vec<String>,

    #[serde(default = "timeout_default")]
    pub timeout: u64,

    #[serde(default = "ping_count_default")]
    pub ping_count: usize,

    #[serde(default = "retries_default")]
    pub retries: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader: Option<UploaderSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloader: Option<DownloaderSection>,
}

/// Validated uploader parameters.
#[derive(Clone, Debug)]
pub struct UploadSettings {
    pub base_dir: PathBuf,
    pub block_size: NonZeroUsize,
    pub policy: Policy,
}

/// Validated downloader parameters.
#[derive(Clone, Debug)]
pub struct DownloadSettings {
    pub base_dir: PathBuf,
    pub block_size: NonZeroUsize,
}

impl Config {
    pub fn new(config_path: &str) -> Result<Self> {
        info!("Using configuration file {config_path}. ");

        let config = fs::read_to_string(config_path)?;
        let config = Self::parse(&config)?;

        Ok(config)
    }

    pub fn parse(config: &str) -> Result<Self> {
        let config = config.trim();
        let config: Self = serde_yaml::from_str(config)?;

        if config.ping_count == 0 {
            return Err(ConfigError::PingCount(config.ping_count).into());
        }

        let peers = config.peers()?;
        info!("Number of peers: {}. ", peers.len());
        for peer in &peers {
            info!("  Peer {peer}. ");
        }

        Ok(config)
    }

    pub fn peers(&self) -> result::Result<Vec<Peer>, ConfigError> {
        peer_set(&self.peers)
    }

    pub fn upload_settings(&self) -> result::Result<UploadSettings, ConfigError> {
        let section = self.uploader.as_ref().ok_or(ConfigError::MissingSection("uploader"))?;

        let base_dir = base_dir(&section.base_dir)?;
        let block_size = block_size(section.block_size)?;
        let policy: Policy = section.policy.parse()?;

        let configured = self.peers.len();
        if configured < policy.min_peers() {
            return Err(ConfigError::NotEnoughPeers {
                policy: policy.to_string(),
                required: policy.min_peers(),
                configured,
            });
        }

        info!("Using base_dir {}. ", base_dir.display());
        info!("Using a block size of {block_size}. ");
        info!("Using a block placement policy of {policy}. ");

        Ok(UploadSettings {
            base_dir,
            block_size,
            policy,
        })
    }

    pub fn download_settings(&self) -> result::Result<DownloadSettings, ConfigError> {
        let section = self.downloader.as_ref().ok_or(ConfigError::MissingSection("downloader"))?;

        let base_dir = base_dir(&section.base_dir)?;
        let block_size = block_size(section.block_size)?;

        info!("Using base_dir {}. ", base_dir.display());
        info!("Using a block size of {block_size}. ");

        Ok(DownloadSettings {
            base_dir,
            block_size,
        })
    }
}

fn base_dir(base_dir: &str) -> result::Result<PathBuf, ConfigError> {
    if base_dir.trim().is_empty() {
        return Err(ConfigError::BaseDirectory(base_dir.to_string()));
    }

    Ok(PathBuf::from(base_dir))
}

fn block_size(block_size: i64) -> result::Result<NonZeroUsize, ConfigError> {
    usize::try_from(block_size)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or(ConfigError::BlockSize(block_size))
}

fn timeout_default() -> u64 {
    debug!("Defaulting config.timeout to {TIMEOUT_DEFAULT}. ");
    TIMEOUT_DEFAULT
}

fn ping_count_default() -> usize {
    debug!("Defaulting config.ping_count to {PING_COUNT_DEFAULT}. ");
    PING_COUNT_DEFAULT
}

fn retries_default() -> u32 {
    debug!("Defaulting config.retries to {RETRIES_DEFAULT}. ");
    RETRIES_DEFAULT
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const FULL: &str = r#"
peers:
  - "127.0.0.1:9000"
  - "127.0.0.1:9001"
  - "127.0.0.1:9002"
timeout: 500
uploader:
  base_dir: /tmp/up
  block_size: 4096
  policy: localfarthest
downloader:
  base_dir: /tmp/down
  block_size: 4096
"#;

    fn config_error(err: anyhow::Error) -> ConfigError {
        err.downcast::<ConfigError>().expect("expected a configuration error")
    }

    #[test]
    fn full_configuration() {
        let config = Config::parse(FULL).unwrap();
        assert_eq!(config.timeout, 500);
        assert_eq!(config.ping_count, PING_COUNT_DEFAULT);
        assert_eq!(config.retries, RETRIES_DEFAULT);
        assert_eq!(config.peers().unwrap().len(), 3);

        let upload = config.upload_settings().unwrap();
        assert_eq!(upload.base_dir, PathBuf::from("/tmp/up"));
        assert_eq!(upload.block_size.get(), 4096);
        assert_eq!(upload.policy, Policy::LocalFarthest);

        let download = config.download_settings().unwrap();
        assert_eq!(download.base_dir, PathBuf::from("/tmp/down"));
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let config = Config::new(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.peers.len(), 3);
    }

    #[test]
    fn unknown_policy_fails_before_any_upload() {
        let config = Config::parse(&FULL.replace("localfarthest", "nearest")).unwrap();
        assert_eq!(
            config.upload_settings().unwrap_err(),
            ConfigError::Policy(String::from("nearest")),
        );
    }

    #[test]
    fn invalid_role_sections() {
        let config = Config::parse(&FULL.replace("block_size: 4096\n  policy", "block_size: 0\n  policy")).unwrap();
        assert_eq!(config.upload_settings().unwrap_err(), ConfigError::BlockSize(0));

        let config = Config::parse(&FULL.replace("base_dir: /tmp/down", "base_dir: \"\"")).unwrap();
        assert!(matches!(config.download_settings().unwrap_err(), ConfigError::BaseDirectory(_)));

        let config = Config::parse("peers: [\"127.0.0.1:9000\"]").unwrap();
        assert_eq!(config.upload_settings().unwrap_err(), ConfigError::MissingSection("uploader"));
    }

    #[test]
    fn pair_policies_need_two_peers() {
        let single = r#"
peers: ["127.0.0.1:9000"]
uploader: { base_dir: /tmp/up, block_size: 16, policy: tworandom }
"#;
        let config = Config::parse(single).unwrap();
        assert!(matches!(
            config.upload_settings().unwrap_err(),
            ConfigError::NotEnoughPeers { required: 2, configured: 1, .. },
        ));

        let config = Config::parse(&single.replace("tworandom", "local")).unwrap();
        assert!(config.upload_settings().is_ok());
    }

    #[test]
    fn peer_list_is_validated_at_load() {
        assert_eq!(config_error(Config::parse("timeout: 5").err().unwrap()), ConfigError::NoPeers);

        let err = Config::parse("peers: [\"127.0.0.1:99999\"]").err().unwrap();
        assert!(matches!(config_error(err), ConfigError::Endpoint { index: 0, .. }));

        let err = Config::parse("peers: [\"127.0.0.1:9000\"]\nping_count: 0").err().unwrap();
        assert_eq!(config_error(err), ConfigError::PingCount(0));
    }
}
