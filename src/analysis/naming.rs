//! Deterministic rule-name generation.

use sha2::{Digest, Sha256};

use super::signature::Signature;

/// Derives a metric name for a recording rule from its signature.
///
/// The name is `<prefix>_<digest>` where the digest is the first 12
/// lowercase hex characters (48 bits) of the SHA-256 of the signature's
/// bytes. The mapping is pure: equal inputs always produce equal names.
pub fn hashed_metric_name(signature: &Signature, prefix: &str) -> String {
    let digest = Sha256::digest(signature.as_str().as_bytes());
    let hex = hex::encode(digest);
    format!("{prefix}_{}", &hex[..12])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::signature::{SignatureOptions, expr_signature};
    use crate::parser;

    fn signature(source: &str) -> Signature {
        let expr = parser::parse(source).ast.expect("expression should parse");
        expr_signature(&expr, &SignatureOptions::default()).expect("signature should render")
    }

    #[test]
    fn name_has_prefix_and_12_hex_chars() {
        let name = hashed_metric_name(&signature("sum by (job) (up)"), "recording_rule");
        let digest = name
            .strip_prefix("recording_rule_")
            .expect("name should start with the prefix");
        assert_eq!(digest.len(), 12);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn names_are_deterministic() {
        let sig = signature(r#"sum by (job) (http_requests_total{env="prod"})"#);
        assert_eq!(
            hashed_metric_name(&sig, "recording_rule"),
            hashed_metric_name(&sig, "recording_rule")
        );
    }

    #[test]
    fn equal_signatures_share_a_name() {
        let name_a = hashed_metric_name(&signature(r#"sum(up{job="a"}) by (job)"#), "rule");
        let name_b = hashed_metric_name(&signature(r#"sum(up{job="b"}) by (job)"#), "rule");
        assert_eq!(name_a, name_b);
    }

    #[test]
    fn different_signatures_get_different_names() {
        let sum = hashed_metric_name(&signature("sum by (job) (up)"), "rule");
        let avg = hashed_metric_name(&signature("avg by (job) (up)"), "rule");
        assert_ne!(sum, avg);
    }

    #[test]
    fn prefix_changes_the_name() {
        let sig = signature("sum(up)");
        let a = hashed_metric_name(&sig, "recording_rule");
        let b = hashed_metric_name(&sig, "precomputed");
        assert_ne!(a, b);
        assert_eq!(a.rsplit('_').next(), b.rsplit('_').next());
    }
}
