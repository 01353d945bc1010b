pub mod app_config;
pub mod config;
pub mod error;
pub mod item;
pub mod settings;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, SettingsError};
pub use item::{item_url, ItemRecord, ValuationResult, ValuationStatus};
pub use settings::{
    ImagePatch, ImageSettings, LoginPatch, LoginSettings, OpenAiPatch, OpenAiSettings, Settings,
    SettingsPatch,
};
