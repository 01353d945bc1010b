use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Process-level configuration read from the environment at startup.
///
/// Runtime tunables (poll interval, retries, valuation settings) live in
/// the persisted [`crate::Settings`] document instead, so they can change
/// without a restart.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Root for all persisted state: `products.json`, `settings.json`,
    /// and the `images/` directory.
    pub data_dir: PathBuf,
}

impl AppConfig {
    #[must_use]
    pub fn products_path(&self) -> PathBuf {
        self.data_dir.join("products.json")
    }

    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    #[must_use]
    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }
}

impl AsRef<Path> for AppConfig {
    fn as_ref(&self) -> &Path {
        &self.data_dir
    }
}
