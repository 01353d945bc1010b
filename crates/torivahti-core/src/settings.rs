//! Typed runtime settings with pure validation.
//!
//! Every field carries a serde default, so loading an older settings file
//! merges missing keys from the defaults instead of failing — keys
//! introduced by upgrades populate automatically on the next load.
//!
//! Updates arrive as a [`SettingsPatch`] (all fields optional) and are
//! applied through [`Settings::apply`], which validates the candidate as a
//! whole and returns either the updated settings or a [`SettingsError`].
//! A rejected patch leaves the original value untouched.

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Hard cap on `max_images_per_item`; the extractor itself only ever yields
/// five URLs per item, anything above this is a configuration mistake.
pub const MAX_IMAGES_CAP: usize = 20;

const fn default_poll_interval() -> u64 {
    60
}
const fn default_request_timeout() -> u64 {
    15
}
const fn default_max_retries() -> u32 {
    2
}
const fn default_products_per_page() -> u32 {
    50
}
fn default_listing_url() -> String {
    "https://www.tori.fi/recommerce/forsale/search?sort=PUBLISHED_DESC&trade_type=2".to_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub poll_interval_seconds: u64,
    pub listing_url: String,
    pub request_timeout_seconds: u64,
    pub max_retries: u32,
    /// Assumed listing-page size, used for the multi-page fetch page count.
    pub products_per_page: u32,
    pub openai: OpenAiSettings,
    pub images: ImageSettings,
    pub login: LoginSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
            listing_url: default_listing_url(),
            request_timeout_seconds: default_request_timeout(),
            max_retries: default_max_retries(),
            products_per_page: default_products_per_page(),
            openai: OpenAiSettings::default(),
            images: ImageSettings::default(),
            login: LoginSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub valuation_interval_minutes: u64,
    pub enabled: bool,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_owned(),
            model: "gpt-4o-mini".to_owned(),
            valuation_interval_minutes: 60,
            enabled: false,
        }
    }
}

impl OpenAiSettings {
    /// Valuation runs only when explicitly enabled and a credential is set.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.api_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub download_enabled: bool,
    pub max_images_per_item: usize,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            download_enabled: true,
            max_images_per_item: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginSettings {
    pub enabled: bool,
    pub username: String,
    pub password: String,
}

/// Partial update for [`Settings`]; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
    pub poll_interval_seconds: Option<u64>,
    pub listing_url: Option<String>,
    pub request_timeout_seconds: Option<u64>,
    pub max_retries: Option<u32>,
    pub products_per_page: Option<u32>,
    pub openai: Option<OpenAiPatch>,
    pub images: Option<ImagePatch>,
    pub login: Option<LoginPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OpenAiPatch {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub valuation_interval_minutes: Option<u64>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImagePatch {
    pub download_enabled: Option<bool>,
    pub max_images_per_item: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginPatch {
    pub enabled: Option<bool>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Settings {
    /// Applies `patch` and validates the result as a whole.
    ///
    /// Pure: `self` is not consumed or mutated; on success the updated
    /// settings are returned, on failure nothing changes anywhere.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when any resulting value is out of range.
    pub fn apply(&self, patch: &SettingsPatch) -> Result<Settings, SettingsError> {
        let mut next = self.clone();

        if let Some(v) = patch.poll_interval_seconds {
            next.poll_interval_seconds = v;
        }
        if let Some(v) = &patch.listing_url {
            next.listing_url.clone_from(v);
        }
        if let Some(v) = patch.request_timeout_seconds {
            next.request_timeout_seconds = v;
        }
        if let Some(v) = patch.max_retries {
            next.max_retries = v;
        }
        if let Some(v) = patch.products_per_page {
            next.products_per_page = v;
        }
        if let Some(p) = &patch.openai {
            if let Some(v) = &p.api_key {
                next.openai.api_key.clone_from(v);
            }
            if let Some(v) = &p.base_url {
                next.openai.base_url.clone_from(v);
            }
            if let Some(v) = &p.model {
                next.openai.model.clone_from(v);
            }
            if let Some(v) = p.valuation_interval_minutes {
                next.openai.valuation_interval_minutes = v;
            }
            if let Some(v) = p.enabled {
                next.openai.enabled = v;
            }
        }
        if let Some(p) = &patch.images {
            if let Some(v) = p.download_enabled {
                next.images.download_enabled = v;
            }
            if let Some(v) = p.max_images_per_item {
                next.images.max_images_per_item = v;
            }
        }
        if let Some(p) = &patch.login {
            if let Some(v) = p.enabled {
                next.login.enabled = v;
            }
            if let Some(v) = &p.username {
                next.login.username.clone_from(v);
            }
            if let Some(v) = &p.password {
                next.login.password.clone_from(v);
            }
        }

        next.validate()?;
        Ok(next)
    }

    /// Checks every invariant over the full settings value.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.poll_interval_seconds < 10 {
            return Err(SettingsError::PollIntervalTooShort(
                self.poll_interval_seconds,
            ));
        }
        if self.request_timeout_seconds < 1 {
            return Err(SettingsError::RequestTimeoutTooShort(
                self.request_timeout_seconds,
            ));
        }
        if self.products_per_page < 1 {
            return Err(SettingsError::ProductsPerPageZero);
        }
        if self.images.max_images_per_item > MAX_IMAGES_CAP {
            return Err(SettingsError::TooManyImagesPerItem {
                got: self.images.max_images_per_item,
                max: MAX_IMAGES_CAP,
            });
        }
        if self.openai.valuation_interval_minutes < 1 {
            return Err(SettingsError::ValuationIntervalZero);
        }
        if self.listing_url.trim().is_empty() {
            return Err(SettingsError::EmptyListingUrl);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Settings::default().validate().expect("defaults must pass");
    }

    #[test]
    fn poll_interval_below_ten_is_rejected() {
        let settings = Settings::default();
        let patch = SettingsPatch {
            poll_interval_seconds: Some(5),
            ..SettingsPatch::default()
        };
        let err = settings.apply(&patch).unwrap_err();
        assert_eq!(err, SettingsError::PollIntervalTooShort(5));
        // Original untouched.
        assert_eq!(settings.poll_interval_seconds, 60);
    }

    #[test]
    fn poll_interval_thirty_is_accepted() {
        let settings = Settings::default();
        let patch = SettingsPatch {
            poll_interval_seconds: Some(30),
            ..SettingsPatch::default()
        };
        let updated = settings.apply(&patch).expect("valid patch");
        assert_eq!(updated.poll_interval_seconds, 30);
    }

    #[test]
    fn zero_request_timeout_is_rejected() {
        let patch = SettingsPatch {
            request_timeout_seconds: Some(0),
            ..SettingsPatch::default()
        };
        let err = Settings::default().apply(&patch).unwrap_err();
        assert_eq!(err, SettingsError::RequestTimeoutTooShort(0));
    }

    #[test]
    fn nested_openai_patch_applies_only_given_fields() {
        let settings = Settings::default();
        let patch = SettingsPatch {
            openai: Some(OpenAiPatch {
                enabled: Some(true),
                api_key: Some("sk-test".to_owned()),
                ..OpenAiPatch::default()
            }),
            ..SettingsPatch::default()
        };
        let updated = settings.apply(&patch).expect("valid patch");
        assert!(updated.openai.enabled);
        assert_eq!(updated.openai.api_key, "sk-test");
        // Untouched nested fields keep their defaults.
        assert_eq!(updated.openai.model, "gpt-4o-mini");
        assert_eq!(updated.openai.valuation_interval_minutes, 60);
    }

    #[test]
    fn invalid_nested_patch_rejected_without_partial_apply() {
        let settings = Settings::default();
        let patch = SettingsPatch {
            listing_url: Some("https://example.com/search".to_owned()),
            openai: Some(OpenAiPatch {
                valuation_interval_minutes: Some(0),
                ..OpenAiPatch::default()
            }),
            ..SettingsPatch::default()
        };
        assert!(settings.apply(&patch).is_err());
        // The valid half of the patch must not have leaked through.
        assert_eq!(settings.listing_url, default_listing_url());
    }

    #[test]
    fn openai_enabled_requires_api_key() {
        let mut openai = OpenAiSettings {
            enabled: true,
            ..OpenAiSettings::default()
        };
        assert!(!openai.is_enabled(), "blank key must not count as enabled");
        openai.api_key = "sk-x".to_owned();
        assert!(openai.is_enabled());
    }

    #[test]
    fn older_settings_file_merges_missing_keys_from_defaults() {
        // A file written before the login section existed.
        let json = r#"{"poll_interval_seconds": 120, "openai": {"enabled": true}}"#;
        let settings: Settings = serde_json::from_str(json).expect("deserialize");
        assert_eq!(settings.poll_interval_seconds, 120);
        assert!(settings.openai.enabled);
        assert_eq!(settings.openai.base_url, "https://api.openai.com/v1");
        assert!(!settings.login.enabled);
        assert_eq!(settings.images.max_images_per_item, 5);
    }
}
