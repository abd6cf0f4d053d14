use blake3::Hasher;

use crate::challenge::Candidates;

/// Canonical form used when comparing questions: trimmed and case-folded.
#[inline]
pub fn normalize_question(question: &str) -> String {
    question.trim().to_lowercase()
}

/// Returns `true` if two questions are equal after [`normalize_question`].
#[inline]
pub fn questions_match(a: &str, b: &str) -> bool {
    normalize_question(a) == normalize_question(b)
}

/// Computes a BLAKE3 digest over every candidate image, in order.
///
/// Each image is length-prefixed so that moving bytes between adjacent candidates
/// changes the digest.
pub fn hash_candidates(candidates: &Candidates) -> [u8; 32] {
    let mut hasher = Hasher::new();
    for (_, image) in candidates.iter() {
        hasher.update(&(image.len() as u64).to_le_bytes());
        hasher.update(image.as_bytes());
    }
    *hasher.finalize().as_bytes()
}

/// Returns the first `len` hex characters of a digest (`len` is capped at 64).
#[inline]
pub fn short_hex(digest: &[u8; 32], len: usize) -> String {
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out.truncate(len.min(64));
    out
}

/// Computes a stable 64-bit seed for `data`, truncated from BLAKE3.
///
/// Used by the stub similarity backend; not a security primitive.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(seed: u8) -> Candidates {
        Candidates::from_bytes((0..4u8).map(|i| vec![seed, i])).unwrap()
    }

    #[test]
    fn test_normalize_question() {
        assert_eq!(normalize_question("  Cherry \n"), "cherry");
        assert_eq!(normalize_question("GOLD Coin"), "gold coin");
    }

    #[test]
    fn test_questions_match_ignores_case_and_whitespace() {
        assert!(questions_match("Cherry", " cherry "));
        assert!(!questions_match("Cherry", "Cherries"));
    }

    #[test]
    fn test_hash_candidates_deterministic() {
        assert_eq!(hash_candidates(&candidates(1)), hash_candidates(&candidates(1)));
        assert_ne!(hash_candidates(&candidates(1)), hash_candidates(&candidates(2)));
    }

    #[test]
    fn test_hash_candidates_is_boundary_sensitive() {
        let a = Candidates::from_bytes(vec![vec![1, 2], vec![3], vec![4], vec![5]]).unwrap();
        let b = Candidates::from_bytes(vec![vec![1], vec![2, 3], vec![4], vec![5]]).unwrap();
        assert_ne!(hash_candidates(&a), hash_candidates(&b));
    }

    #[test]
    fn test_short_hex() {
        let digest = [0xABu8; 32];
        assert_eq!(short_hex(&digest, 6), "ababab");
        assert_eq!(short_hex(&digest, 100).len(), 64);
    }

    #[test]
    fn test_hash_to_u64_stable() {
        assert_eq!(hash_to_u64(b"cherry"), hash_to_u64(b"cherry"));
        assert_ne!(hash_to_u64(b"cherry"), hash_to_u64(b"banana"));
    }
}
