pub mod error;
pub mod items;
pub mod settings;

pub use error::StoreError;
pub use items::ItemStore;
pub use settings::SettingsStore;
