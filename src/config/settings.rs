use std::path::{Path, PathBuf};

use serde::Deserialize;

/// パイプライン全体の設定。
///
/// YAMLで省略されたフィールドは [`Settings::default`] の値になる。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 最適化後の最大幅(px)
    pub max_width: u32,
    /// 最適化後の最大高さ(px)
    pub max_height: u32,
    /// 最適化時の再エンコード品質 (1-100)
    pub optimize_quality: u8,
    /// PDF埋め込み時のJPEG品質 (1-100)
    pub embed_quality: u8,
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    pub page_margin_pt: f32,
    /// ラベル帯の高さ(px)
    pub label_margin_px: u32,
    pub label_font_min: f32,
    pub label_font_max: f32,
    /// ラベル用の優先フォントファイル
    pub label_font_path: Option<PathBuf>,
    pub add_labels: bool,
    pub compress: bool,
    /// 0 のとき rayon のグローバルプールを使う
    pub parallel_workers: usize,
    /// 一時ディレクトリのルート（None ならOS既定）
    pub temp_dir: Option<PathBuf>,
    pub cleanup_grace_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_width: 1654,
            max_height: 2339,
            optimize_quality: 95,
            embed_quality: 85,
            page_width_pt: 595.0,
            page_height_pt: 842.0,
            page_margin_pt: 36.0,
            label_margin_px: 60,
            label_font_min: 12.0,
            label_font_max: 32.0,
            label_font_path: None,
            add_labels: true,
            compress: true,
            parallel_workers: 0,
            temp_dir: None,
            cleanup_grace_secs: 300,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        let settings: Settings = serde_yml::from_str(yaml).map_err(|e| {
            crate::error::SnapMergeError::config(format!("Failed to parse settings YAML: {e}"))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// 値の範囲を検証する。
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::SnapMergeError;

        for (name, quality) in [
            ("optimize_quality", self.optimize_quality),
            ("embed_quality", self.embed_quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(SnapMergeError::config(format!(
                    "{name} must be 1-100, got {quality}"
                )));
            }
        }

        if self.max_width == 0 || self.max_height == 0 {
            return Err(SnapMergeError::config(format!(
                "max_width and max_height must be positive, got {}x{}",
                self.max_width, self.max_height
            )));
        }

        let usable_w = self.page_width_pt - 2.0 * self.page_margin_pt;
        let usable_h = self.page_height_pt - 2.0 * self.page_margin_pt;
        if self.page_margin_pt < 0.0 || usable_w <= 0.0 || usable_h <= 0.0 {
            return Err(SnapMergeError::config(format!(
                "page margin {} leaves no usable area on a {}x{} page",
                self.page_margin_pt, self.page_width_pt, self.page_height_pt
            )));
        }

        if !self.label_font_min.is_finite()
            || !self.label_font_max.is_finite()
            || self.label_font_min <= 0.0
            || self.label_font_min > self.label_font_max
        {
            return Err(SnapMergeError::config(format!(
                "invalid label font range: {}..{}",
                self.label_font_min, self.label_font_max
            )));
        }

        Ok(())
    }
}
