use super::settings::Settings;

/// 起動ごとの上書き値（CLI引数など）。
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub optimize_quality: Option<u8>,
    pub add_labels: Option<bool>,
    pub compress: Option<bool>,
}

/// 検証済みの設定。[`MergedConfig::new`] 以外では構築できない。
#[derive(Debug, Clone)]
pub struct MergedConfig {
    settings: Settings,
}

impl MergedConfig {
    /// OverridesのOption値がSomeならその値を、NoneならSettingsの値を使用する。
    pub fn new(settings: &Settings, overrides: &Overrides) -> crate::error::Result<Self> {
        let mut merged = settings.clone();
        if let Some(q) = overrides.optimize_quality {
            merged.optimize_quality = q;
        }
        if let Some(labels) = overrides.add_labels {
            merged.add_labels = labels;
        }
        if let Some(compress) = overrides.compress {
            merged.compress = compress;
        }
        merged.validate()?;
        Ok(MergedConfig { settings: merged })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn into_settings(self) -> Settings {
        self.settings
    }
}
