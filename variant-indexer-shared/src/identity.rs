//! Stable document identity.
//!
//! Several independent runs over the same cohort (for example a "control"
//! and a "case" VCF) must converge onto one document per variant, so the id
//! depends only on the variant coordinates and the index it lives in.

use sha2::{Digest, Sha224};

/// Compute the backend document id of a variant.
///
/// The six parts are concatenated in order without separators and hashed
/// with SHA-224; the lowercase hex digest is the id.
///
/// # Arguments
///
/// * `chrom` - Chromosome as written in the VCF
/// * `pos` - 1-based position
/// * `ref_allele` - Reference allele
/// * `alt` - Alternate allele(s)
/// * `index_name` - Target index
/// * `type_name` - Target document type
pub fn compute_id(
    chrom: &str,
    pos: u64,
    ref_allele: &str,
    alt: &str,
    index_name: &str,
    type_name: &str,
) -> String {
    let key = format!(
        "{}{}{}{}{}{}",
        chrom, pos, ref_allele, alt, index_name, type_name
    );

    let mut hasher = Sha224::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_compute_id_known_digest() {
        assert_eq!(
            compute_id("1", 100, "A", "T", "variants", "wes"),
            "041ba18ada564c16022588ef3863eee749c96233971fca4421151650"
        );
    }

    #[test]
    fn test_compute_id_deterministic() {
        let first = compute_id("chr1", 123, "A", "T", "variants", "wes");
        let second = compute_id("chr1", 123, "A", "T", "variants", "wes");

        assert_eq!(first, second);
        assert_eq!(first, "8132440ec37b674c08930918b8741ba263e9dc1f0828d5db9dd4217a");
        assert_eq!(first.len(), 56);
    }

    #[test]
    fn test_compute_id_no_collisions_in_fixture() {
        let tuples = [
            ("1", 100, "A", "T", "variants", "wes"),
            ("1", 100, "A", "G", "variants", "wes"),
            ("1", 101, "A", "T", "variants", "wes"),
            ("2", 100, "A", "T", "variants", "wes"),
            ("1", 100, "AT", "A", "variants", "wes"),
            ("1", 100, "A", "T", "other", "wes"),
            ("1", 100, "A", "T", "variants", "wgs"),
            ("X", 155_000_000, "C", ".", "variants", "wes"),
        ];

        let ids: HashSet<String> = tuples
            .iter()
            .map(|(c, p, r, a, i, t)| compute_id(c, *p, r, a, i, t))
            .collect();

        assert_eq!(ids.len(), tuples.len());
    }
}
