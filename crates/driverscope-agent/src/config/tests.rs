#[cfg(test)]
mod tests {
    use super::super::*;
    use driverscope_common::{EvidenceType, SurvivalTest};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const SAMPLE: &str = r#"
[analysis]
causal_score_threshold = 0.6

[analysis.evidence_weights]
differential_expression = 0.4
survival_association = 0.4
cnv_driver = 0.2
methylation_regulation = 0.0
mutation_frequency = 0.0

[analysis.collectors]
survival_test = "cox"

[analysis.validation]
bootstrap_iterations = 20

[input]
data_dir = "data/brca"

[output]
path = "out/result.json"

[runtime]
threads = 4
timeout_secs = 600
"#;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.analysis.causal_score_threshold, 0.7);
        assert_eq!(config.output.path, PathBuf::from("driverscope_result.json"));
        assert!(config.output.pretty);
        assert_eq!(config.runtime.threads, None);
    }

    #[test]
    fn test_sections_parsed() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.analysis.causal_score_threshold, 0.6);
        assert_eq!(config.analysis.evidence_weights.get(EvidenceType::MethylationRegulation), 0.0);
        assert_eq!(config.analysis.collectors.survival_test, SurvivalTest::Cox);
        assert_eq!(config.analysis.validation.bootstrap_iterations, 20);
        // Untouched fields keep their defaults
        assert_eq!(config.analysis.validation.cross_validation_folds, 5);
        assert_eq!(config.input.data_dir, Some(PathBuf::from("data/brca")));
        assert_eq!(config.runtime.timeout_secs, Some(600));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = Config::load(Path::new("/nonexistent/driverscope.toml")).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_rejects_invalid_weights() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[analysis.evidence_weights]\ndifferential_expression = -1.0"
        )
        .unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_input_requires_a_source() {
        assert!(InputConfig::default().resolve().is_err());
    }
}
