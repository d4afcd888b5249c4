use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Runtime settings for a wizard session and its outbound clients.
#[derive(Debug, Clone)]
pub struct WizardConfig {
    pub autosave_debounce: Duration,
    pub geocode_debounce: Duration,
    pub max_images: usize,
    pub storage_dir: PathBuf,
    pub storage_namespace: String,
    pub session_key: String,
    pub catalog_url: String,
    pub geocoder_url: String,
    pub http_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            autosave_debounce: Duration::from_millis(1500),
            geocode_debounce: Duration::from_millis(1500),
            max_images: 10,
            storage_dir: PathBuf::from("./.wizard-drafts"),
            storage_namespace: "property-wizard-draft".to_string(),
            session_key: "anonymous".to_string(),
            catalog_url: "http://localhost:3000/api".to_string(),
            geocoder_url: "https://nominatim.openstreetmap.org".to_string(),
            http_timeout_secs: 30,
            user_agent: "listing-wizard/0.1".to_string(),
        }
    }
}

impl WizardConfig {
    /// Durable storage key: fixed namespace scoped to the session/user.
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.storage_namespace, self.session_key)
    }

    /// Loads configuration from the environment, reading a `.env` file first
    /// when one exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnvVar`] when a numeric variable does not parse
    /// or is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        build_config(|key| std::env::var(key))
    }
}

/// Builds configuration from an arbitrary lookup so tests can feed a map.
fn build_config<F>(lookup: F) -> Result<WizardConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let defaults = WizardConfig::default();

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, default: u64| -> Result<u64, ConfigError> {
        match lookup(var) {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Ok(default),
        }
    };

    let autosave_ms = parse_u64("WIZARD_AUTOSAVE_DEBOUNCE_MS", 1500)?;
    let geocode_ms = parse_u64("WIZARD_GEOCODE_DEBOUNCE_MS", 1500)?;
    let http_timeout_secs = parse_u64("WIZARD_HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?;

    let max_images = parse_u64("WIZARD_MAX_IMAGES", defaults.max_images as u64)?;
    if max_images == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "WIZARD_MAX_IMAGES".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let storage_dir = lookup("WIZARD_STORAGE_DIR")
        .map(PathBuf::from)
        .unwrap_or(defaults.storage_dir);

    Ok(WizardConfig {
        autosave_debounce: Duration::from_millis(autosave_ms),
        geocode_debounce: Duration::from_millis(geocode_ms),
        max_images: usize::try_from(max_images).map_err(|e| ConfigError::InvalidEnvVar {
            var: "WIZARD_MAX_IMAGES".to_string(),
            reason: e.to_string(),
        })?,
        storage_dir,
        storage_namespace: or_default("WIZARD_STORAGE_NAMESPACE", &defaults.storage_namespace),
        session_key: or_default("WIZARD_SESSION_KEY", &defaults.session_key),
        catalog_url: or_default("WIZARD_CATALOG_URL", &defaults.catalog_url),
        geocoder_url: or_default("WIZARD_GEOCODER_URL", &defaults.geocoder_url),
        http_timeout_secs,
        user_agent: or_default("WIZARD_USER_AGENT", &defaults.user_agent),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    #[test]
    fn empty_env_yields_defaults() {
        let map = HashMap::new();
        let config = build_config(lookup_from_map(&map)).unwrap();
        assert_eq!(config.autosave_debounce, Duration::from_millis(1500));
        assert_eq!(config.geocode_debounce, Duration::from_millis(1500));
        assert_eq!(config.max_images, 10);
        assert_eq!(config.storage_key(), "property-wizard-draft:anonymous");
    }

    #[test]
    fn overrides_are_applied() {
        let map = HashMap::from([
            ("WIZARD_AUTOSAVE_DEBOUNCE_MS", "250"),
            ("WIZARD_MAX_IMAGES", "3"),
            ("WIZARD_SESSION_KEY", "agent-42"),
            ("WIZARD_STORAGE_DIR", "/tmp/drafts"),
        ]);
        let config = build_config(lookup_from_map(&map)).unwrap();
        assert_eq!(config.autosave_debounce, Duration::from_millis(250));
        assert_eq!(config.max_images, 3);
        assert_eq!(config.storage_key(), "property-wizard-draft:agent-42");
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/drafts"));
    }

    #[test]
    fn invalid_number_is_rejected() {
        let map = HashMap::from([("WIZARD_GEOCODE_DEBOUNCE_MS", "soon")]);
        let result = build_config(lookup_from_map(&map));
        assert!(
            matches!(
                result,
                Err(ConfigError::InvalidEnvVar { ref var, .. })
                    if var == "WIZARD_GEOCODE_DEBOUNCE_MS"
            ),
            "expected InvalidEnvVar, got: {result:?}"
        );
    }

    #[test]
    fn zero_image_limit_is_rejected() {
        let map = HashMap::from([("WIZARD_MAX_IMAGES", "0")]);
        assert!(build_config(lookup_from_map(&map)).is_err());
    }
}
