// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tests for TSIG key file parsing.

#[cfg(test)]
mod tests {
    use crate::tsig::{create_tsig_signer, load_key_file, parse_key_file, TsigAlgorithm};
    use std::io::Write;
    use std::str::FromStr;

    const KEY_FILE: &str = r#"key "ddns-key.example.com" {
    algorithm hmac-sha256;
    secret "c2VjcmV0LWtleS1tYXRlcmlhbC1mb3ItdGVzdHM=";
};
"#;

    #[test]
    fn test_parse_key_file() {
        let key = parse_key_file(KEY_FILE).unwrap();

        assert_eq!(key.name, "ddns-key.example.com");
        assert_eq!(key.algorithm, TsigAlgorithm::HmacSha256);
        assert_eq!(key.secret, "c2VjcmV0LWtleS1tYXRlcmlhbC1mb3ItdGVzdHM=");
    }

    #[test]
    fn test_parse_key_file_unquoted_name() {
        let content = "key ddns-key {\n algorithm hmac-sha512;\n secret \"dGVzdA==\";\n};\n";
        let key = parse_key_file(content).unwrap();

        assert_eq!(key.name, "ddns-key");
        assert_eq!(key.algorithm, TsigAlgorithm::HmacSha512);
    }

    #[test]
    fn test_parse_key_file_missing_secret() {
        let content = "key \"k\" {\n algorithm hmac-sha256;\n};\n";
        assert!(parse_key_file(content).is_err());
    }

    #[test]
    fn test_parse_key_file_bad_base64() {
        let content = "key \"k\" {\n algorithm hmac-sha256;\n secret \"not base64!\";\n};\n";
        assert!(parse_key_file(content).is_err());
    }

    #[test]
    fn test_parse_key_file_unsupported_algorithm() {
        let content = "key \"k\" {\n algorithm hmac-whirlpool;\n secret \"dGVzdA==\";\n};\n";
        let err = parse_key_file(content).unwrap_err();
        assert!(err.to_string().contains("Unsupported TSIG algorithm"));
    }

    #[test]
    fn test_algorithm_round_trip_names() {
        for algorithm in [
            TsigAlgorithm::HmacMd5,
            TsigAlgorithm::HmacSha1,
            TsigAlgorithm::HmacSha224,
            TsigAlgorithm::HmacSha256,
            TsigAlgorithm::HmacSha384,
            TsigAlgorithm::HmacSha512,
        ] {
            assert_eq!(TsigAlgorithm::from_str(algorithm.as_str()).unwrap(), algorithm);
        }
        assert_eq!(
            TsigAlgorithm::from_str("HMAC-MD5.SIG-ALG.REG.INT.").unwrap(),
            TsigAlgorithm::HmacMd5
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let key = parse_key_file(KEY_FILE).unwrap();
        let debug_str = format!("{key:?}");

        assert!(debug_str.contains("ddns-key.example.com"));
        assert!(!debug_str.contains("c2VjcmV0"));
    }

    #[test]
    fn test_create_tsig_signer() {
        let key = parse_key_file(KEY_FILE).unwrap();
        assert!(create_tsig_signer(&key).is_ok());
    }

    #[tokio::test]
    async fn test_load_key_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(KEY_FILE.as_bytes()).unwrap();

        let key = load_key_file(file.path()).await.unwrap();
        assert_eq!(key.name, "ddns-key.example.com");
    }

    #[tokio::test]
    async fn test_load_key_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_key_file(&dir.path().join("missing.key")).await;
        assert!(result.is_err());
    }
}
