#[cfg(test)]
mod tests {
    use crate::config::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::NamedTempFile;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_default_config_valid() {
        let config = GazeplayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.thresholds.pitch_down_threshold, -0.35);
        assert_eq!(config.dispatch.strategy, DispatchStrategy::MediaKey);
    }

    #[test]
    fn test_config_validation_thresholds() {
        let mut config = GazeplayConfig::default();
        config.thresholds.pitch_down_threshold = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = GazeplayConfig::default();
        config.thresholds.facing_angle_bound_rad = 0.0;
        assert!(config.validate().is_err());
        config.thresholds.facing_angle_bound_rad = 2.0;
        assert!(config.validate().is_err());

        let mut config = GazeplayConfig::default();
        config.thresholds.max_stable_frames = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_timing() {
        let mut config = GazeplayConfig::default();
        config.timing.on_delay_sec = 0.0;
        assert!(config.validate().is_err());

        let mut config = GazeplayConfig::default();
        config.timing.watchdog_period_sec = -1.0;
        assert!(config.validate().is_err());

        let mut config = GazeplayConfig::default();
        config.timing.command_min_interval_sec = f32::INFINITY;
        assert!(config.validate().is_err());

        // Off-dwell must fit inside the face-loss timeout
        let mut config = GazeplayConfig::default();
        config.timing.off_delay_sec = 2.5;
        assert!(config.validate().is_err());
        config.timing.face_loss_timeout_sec = 2.5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_dispatch() {
        let mut config = GazeplayConfig::default();
        config.dispatch.strategy = DispatchStrategy::TabScript;
        config.dispatch.domain_allowlist.clear();
        assert!(config.validate().is_err());

        // Empty list is fine for the media-key strategy
        config.dispatch.strategy = DispatchStrategy::MediaKey;
        assert!(config.validate().is_ok());

        config.dispatch.domain_allowlist = vec!["youtube.com/watch".to_string()];
        assert!(config.validate().is_err());
        config.dispatch.domain_allowlist = vec!["  ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_to_toml_string() {
        let config = GazeplayConfig::default();
        let toml_str = config.to_toml_string().unwrap();

        assert!(toml_str.contains("[thresholds]"));
        assert!(toml_str.contains("[timing]"));
        assert!(toml_str.contains("[dispatch]"));
        assert!(toml_str.contains("pitch_down_threshold"));
        assert!(toml_str.contains("strategy = \"media_key\""));

        let parsed: GazeplayConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_config_from_toml_string() {
        let toml_str = r#"
            [thresholds]
            pitch_down_threshold = -0.2
            facing_angle_bound_rad = 0.3
            max_stable_frames = 8

            [timing]
            on_delay_sec = 0.4
            off_delay_sec = 1.0
            min_frame_interval_sec = 0.05
            landmark_refresh_interval_sec = 0.5
            face_loss_timeout_sec = 1.5
            watchdog_period_sec = 0.25
            command_min_interval_sec = 2.0

            [dispatch]
            strategy = "tab_script"
            domain_allowlist = ["youtube.com", "example.org"]
        "#;

        let config: GazeplayConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.thresholds.pitch_down_threshold, -0.2);
        assert_eq!(config.thresholds.max_stable_frames, 8);
        assert_eq!(config.timing.command_min_interval_sec, 2.0);
        assert_eq!(config.dispatch.strategy, DispatchStrategy::TabScript);
        assert_eq!(config.dispatch.domain_allowlist.len(), 2);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
            [timing]
            on_delay_sec = 0.8
        "#;
        let config: GazeplayConfig = toml::from_str(toml_str).unwrap();
        let defaults = GazeplayConfig::default();

        assert_eq!(config.timing.on_delay_sec, 0.8);
        assert_eq!(config.timing.off_delay_sec, defaults.timing.off_delay_sec);
        assert_eq!(config.thresholds, defaults.thresholds);
        assert_eq!(config.dispatch, defaults.dispatch);
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let toml_str = r#"
            [dispatch]
            strategy = "carrier_pigeon"
        "#;
        assert!(toml::from_str::<GazeplayConfig>(toml_str).is_err());
        assert!("carrier-pigeon".parse::<DispatchStrategy>().is_err());
        assert_eq!(
            "Tab-Script".parse::<DispatchStrategy>().unwrap(),
            DispatchStrategy::TabScript
        );
    }

    #[test]
    fn test_config_save_and_load() {
        let mut config = GazeplayConfig::default();
        config.timing.on_delay_sec = 0.7;

        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();
        config.save_to_file(path).unwrap();

        let loaded = GazeplayConfig::from_file(path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_from_file_rejects_invalid_values() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(
            temp_file.path(),
            "[timing]\noff_delay_sec = 3.0\nface_loss_timeout_sec = 2.0\n",
        )
        .unwrap();

        match GazeplayConfig::from_file(temp_file.path()) {
            Err(ConfigError::Validation(msg)) => assert!(msg.contains("off_delay_sec")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_from_file_reports_parse_errors() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), "[timing\non_delay_sec = ").unwrap();
        assert!(matches!(
            GazeplayConfig::from_file(temp_file.path()),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn test_config_overrides() {
        let mut config = GazeplayConfig::default();
        config
            .apply_overrides_from(lookup_from(&[
                ("GAZEPLAY_PITCH_DOWN_THRESHOLD", "-0.1"),
                ("GAZEPLAY_ON_DELAY_SEC", " 0.9 "),
                ("GAZEPLAY_MAX_STABLE_FRAMES", "12"),
                ("GAZEPLAY_DISPATCH_STRATEGY", "tab_script"),
                ("GAZEPLAY_DOMAIN_ALLOWLIST", "youtube.com, ,vimeo.com"),
            ]))
            .unwrap();

        assert_eq!(config.thresholds.pitch_down_threshold, -0.1);
        assert_eq!(config.timing.on_delay_sec, 0.9);
        assert_eq!(config.thresholds.max_stable_frames, 12);
        assert_eq!(config.dispatch.strategy, DispatchStrategy::TabScript);
        assert_eq!(
            config.dispatch.domain_allowlist,
            vec!["youtube.com".to_string(), "vimeo.com".to_string()]
        );
        // Untouched keys keep their values
        assert_eq!(config.timing.off_delay_sec, 1.2);
    }

    #[test]
    fn test_config_override_parse_errors() {
        let mut config = GazeplayConfig::default();
        let err = config
            .apply_overrides_from(lookup_from(&[("GAZEPLAY_OFF_DELAY_SEC", "soon")]))
            .unwrap_err();
        match err {
            ConfigError::EnvVar { name, .. } => assert_eq!(name, "GAZEPLAY_OFF_DELAY_SEC"),
            other => panic!("unexpected error {other:?}"),
        }

        let err = config
            .apply_overrides_from(lookup_from(&[("GAZEPLAY_DISPATCH_STRATEGY", "bluetooth")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));

        let err = config
            .apply_overrides_from(lookup_from(&[("GAZEPLAY_MAX_STABLE_FRAMES", "-3")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
    }

    #[test]
    fn test_config_layered_loading() {
        let default_file = NamedTempFile::new().unwrap();
        let user_file = NamedTempFile::new().unwrap();

        let mut default_config = GazeplayConfig::default();
        default_config.thresholds.pitch_down_threshold = -0.5;
        default_config.save_to_file(default_file.path()).unwrap();

        let mut user_config = GazeplayConfig::default();
        user_config.timing.on_delay_sec = 0.3;
        user_config.save_to_file(user_file.path()).unwrap();

        let loaded =
            GazeplayConfig::load_layered(Some(default_file.path()), Some(user_file.path()))
                .unwrap();
        assert_eq!(loaded.timing.on_delay_sec, 0.3);
        // User file replaces the default file wholesale
        assert_eq!(loaded.thresholds.pitch_down_threshold, -0.35);

        let only_default = GazeplayConfig::load_layered(Some(default_file.path()), None).unwrap();
        assert_eq!(only_default.thresholds.pitch_down_threshold, -0.5);
    }

    #[test]
    fn test_layered_loading_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let loaded = GazeplayConfig::load_layered(Some(&missing), Some(&missing)).unwrap();
        assert_eq!(loaded, GazeplayConfig::default());
    }

    #[test]
    fn test_threshold_config_microseconds() {
        let thr = GazeplayConfig::default().threshold_config();
        assert_eq!(thr.on_delay_us, 500_000);
        assert_eq!(thr.off_delay_us, 1_200_000);
        assert_eq!(thr.min_frame_interval_us, 100_000);
        assert_eq!(thr.landmark_refresh_interval_us, 1_000_000);
        assert_eq!(thr.face_loss_timeout_us, 2_000_000);
        assert_eq!(thr.watchdog_period_us, 500_000);
        assert_eq!(thr.command_min_interval_us, 1_500_000);
        assert_eq!(thr.max_stable_frames, 5);
        assert_eq!(thr, ThresholdConfig::default());
    }

    #[test]
    fn test_engine_from_custom_config() {
        use crate::engine::AttentionEngine;
        use crate::sinks::{MediaKeyPoster, MediaKeySink};
        use crate::error::DispatchError;
        use std::sync::Arc;

        struct Noop;
        impl MediaKeyPoster for Noop {
            fn send_play_pause(&self) -> Result<(), DispatchError> {
                Ok(())
            }
        }

        let mut config = GazeplayConfig::default();
        config.thresholds.pitch_down_threshold = 0.25;
        config.timing.watchdog_period_sec = 0.2;

        let engine = AttentionEngine::from_config(&config, Arc::new(MediaKeySink::new(Noop)));
        assert_eq!(engine.snapshot().pitch_down_threshold, 0.25);
        assert_eq!(engine.watchdog_period_us(), 200_000);
    }
}
