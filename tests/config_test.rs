// 設定ファイル解析テスト

use std::io::Write;
use std::path::Path;

use snapmerge::config::load_settings;
use snapmerge::config::merged::{MergedConfig, Overrides};
use snapmerge::config::settings::Settings;

// ============================================================
// 1. Settings 構造体のデシリアライズ
// ============================================================

#[test]
fn test_settings_full_yaml() {
    let yaml = r#"
max_width: 800
max_height: 1200
optimize_quality: 60
embed_quality: 70
page_width_pt: 612
page_height_pt: 792
page_margin_pt: 20
label_margin_px: 80
label_font_min: 10
label_font_max: 40
label_font_path: "/fonts/DejaVuSans-Bold.ttf"
add_labels: false
compress: false
parallel_workers: 4
temp_dir: "/tmp/snapmerge"
cleanup_grace_secs: 5
"#;
    let settings = Settings::from_yaml(yaml).expect("should parse full YAML");
    assert_eq!(settings.max_width, 800);
    assert_eq!(settings.max_height, 1200);
    assert_eq!(settings.optimize_quality, 60);
    assert_eq!(settings.embed_quality, 70);
    assert_eq!(settings.page_width_pt, 612.0);
    assert_eq!(settings.page_margin_pt, 20.0);
    assert_eq!(settings.label_margin_px, 80);
    assert_eq!(settings.label_font_max, 40.0);
    assert_eq!(
        settings.label_font_path.as_deref(),
        Some(Path::new("/fonts/DejaVuSans-Bold.ttf"))
    );
    assert!(!settings.add_labels);
    assert!(!settings.compress);
    assert_eq!(settings.parallel_workers, 4);
    assert_eq!(settings.temp_dir.as_deref(), Some(Path::new("/tmp/snapmerge")));
    assert_eq!(settings.cleanup_grace_secs, 5);
}

#[test]
fn test_settings_empty_yaml() {
    // 空YAML（"{}" はserde_ymlで空のマッピングを意味する）
    let settings = Settings::from_yaml("{}").expect("should use defaults for empty YAML");
    let defaults = Settings::default();
    assert_eq!(settings.max_width, defaults.max_width);
    assert_eq!(settings.optimize_quality, 95);
    assert_eq!(settings.embed_quality, 85);
    assert_eq!(settings.label_margin_px, 60);
    assert!(settings.add_labels);
    assert!(settings.compress);
    assert!(settings.label_font_path.is_none());
    assert!(settings.temp_dir.is_none());
}

#[test]
fn test_settings_partial_yaml() {
    let settings = Settings::from_yaml("optimize_quality: 60\n").expect("partial YAML");
    assert_eq!(settings.optimize_quality, 60);
    // 残りはデフォルト値
    assert_eq!(settings.embed_quality, 85);
    assert_eq!(settings.page_margin_pt, 36.0);
}

// ============================================================
// 2. 値の検証
// ============================================================

#[test]
fn test_settings_rejects_quality_out_of_range() {
    assert!(Settings::from_yaml("optimize_quality: 0\n").is_err());
    assert!(Settings::from_yaml("embed_quality: 101\n").is_err());
}

#[test]
fn test_settings_rejects_zero_bound() {
    assert!(Settings::from_yaml("max_width: 0\n").is_err());
}

#[test]
fn test_settings_rejects_margin_without_usable_area() {
    let result = Settings::from_yaml("page_width_pt: 100\npage_margin_pt: 50\n");
    assert!(result.is_err(), "margin consumes the whole page width");
}

#[test]
fn test_settings_rejects_inverted_font_range() {
    assert!(Settings::from_yaml("label_font_min: 40\nlabel_font_max: 20\n").is_err());
}

#[test]
fn test_settings_rejects_malformed_yaml() {
    assert!(Settings::from_yaml("max_width: [1, 2").is_err());
}

// ============================================================
// 3. 設定ファイルの読み込み
// ============================================================

#[test]
fn test_load_settings_explicit_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("custom.yaml");
    let mut f = std::fs::File::create(&path).expect("create settings file");
    writeln!(f, "max_width: 640").expect("write settings");

    let settings = load_settings(Some(&path)).expect("load explicit settings");
    assert_eq!(settings.max_width, 640);
}

#[test]
fn test_load_settings_missing_explicit_file_is_error() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let result = load_settings(Some(&dir.path().join("nope.yaml")));
    assert!(result.is_err());
}

// ============================================================
// 4. Overrides とのマージ
// ============================================================

#[test]
fn test_merged_config_overrides_win() {
    let settings = Settings::default();
    let overrides = Overrides {
        optimize_quality: Some(60),
        add_labels: Some(false),
        compress: None,
    };
    let merged = MergedConfig::new(&settings, &overrides).expect("valid merge");
    assert_eq!(merged.settings().optimize_quality, 60);
    assert!(!merged.settings().add_labels);
    assert!(merged.settings().compress, "None keeps the settings value");
}

#[test]
fn test_merged_config_validates_overrides() {
    let overrides = Overrides {
        optimize_quality: Some(0),
        ..Overrides::default()
    };
    assert!(MergedConfig::new(&Settings::default(), &overrides).is_err());
}

#[test]
fn test_merged_config_rejects_inverted_font_range() {
    let settings = Settings {
        label_font_min: 40.0,
        label_font_max: 20.0,
        ..Settings::default()
    };
    let err = MergedConfig::new(&settings, &Overrides::default()).unwrap_err();
    assert!(err.to_string().contains("label font range"), "{err}");
}

#[test]
fn test_merged_config_rejects_nan_font_size() {
    let settings = Settings {
        label_font_min: f32::NAN,
        ..Settings::default()
    };
    assert!(MergedConfig::new(&settings, &Overrides::default()).is_err());
}
