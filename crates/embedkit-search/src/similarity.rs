//! Vector similarity functions.
//!
//! Every vector in one comparison must have the same length. A mismatch is
//! an error, never a truncation.

use crate::error::SearchError;

/// Cosine similarity between two vectors.
///
/// Returns a value in [-1.0, 1.0] where 1.0 = identical direction.
/// Dot product and both norms are accumulated in one pass using `f64`.
///
/// # Errors
/// `EmptyVector`, `DimensionMismatch`, `NonFiniteValue` (index of the first
/// offending component in either vector), or `ZeroNorm`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, SearchError> {
    if a.is_empty() || b.is_empty() {
        return Err(SearchError::EmptyVector);
    }
    if a.len() != b.len() {
        return Err(SearchError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (index, (&x, &y)) in a.iter().zip(b).enumerate() {
        if !x.is_finite() || !y.is_finite() {
            return Err(SearchError::NonFiniteValue { index });
        }
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(SearchError::ZeroNorm);
    }

    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    Ok(sim.clamp(-1.0, 1.0) as f32)
}

/// Check that `v` is non-empty and every component is finite.
///
/// An all-zero vector passes; it scores 0.0 against everything.
pub fn validate_vector(v: &[f32]) -> Result<(), SearchError> {
    if v.is_empty() {
        return Err(SearchError::EmptyVector);
    }
    if let Some(index) = v.iter().position(|x| !x.is_finite()) {
        return Err(SearchError::NonFiniteValue { index });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn random_vector(rng: &mut impl Rng, dim: usize) -> Vec<f32> {
        (0..dim).map(|_| rng.random_range(-1.0f32..1.0)).collect()
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![0.3, -0.2, 0.9];
        assert!((cosine_similarity(&a, &a).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).unwrap().abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![-1.0, -2.0, -3.0];
        assert!((cosine_similarity(&a, &b).unwrap() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_similar() {
        let a = vec![0.8, 0.6];
        let b = vec![0.6, 0.8];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!(sim > 0.9);
    }

    #[test]
    fn test_errors_are_distinct() {
        assert!(matches!(
            cosine_similarity(&[], &[1.0]),
            Err(SearchError::EmptyVector)
        ));
        assert!(matches!(
            cosine_similarity(&[1.0, 0.0], &[1.0]),
            Err(SearchError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
        assert!(matches!(
            cosine_similarity(&[1.0, f32::NAN], &[1.0, 0.0]),
            Err(SearchError::NonFiniteValue { index: 1 })
        ));
        assert!(matches!(
            cosine_similarity(&[1.0, 0.0], &[f32::INFINITY, 0.0]),
            Err(SearchError::NonFiniteValue { index: 0 })
        ));
        assert!(matches!(
            cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]),
            Err(SearchError::ZeroNorm)
        ));
    }

    #[test]
    fn test_random_vectors_properties() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let dim = rng.random_range(1..64);
            let a = random_vector(&mut rng, dim);
            let b = random_vector(&mut rng, dim);
            let (Ok(ab), Ok(ba)) = (cosine_similarity(&a, &b), cosine_similarity(&b, &a)) else {
                continue;
            };
            assert!((-1.0..=1.0).contains(&ab));
            assert!((ab - ba).abs() < 1e-6);

            // positive scaling does not change direction
            let scaled: Vec<f32> = a.iter().map(|x| x * 3.5).collect();
            let sb = cosine_similarity(&scaled, &b).unwrap();
            assert!((sb - ab).abs() < 1e-5);
        }
    }

    #[test]
    fn test_self_similarity_random() {
        let mut rng = rand::rng();
        for _ in 0..100 {
            let v = random_vector(&mut rng, 384);
            assert!((cosine_similarity(&v, &v).unwrap() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_validate_vector() {
        assert!(validate_vector(&[0.1, 0.2]).is_ok());
        assert!(matches!(validate_vector(&[]), Err(SearchError::EmptyVector)));
        assert!(matches!(
            validate_vector(&[0.0, f32::NEG_INFINITY]),
            Err(SearchError::NonFiniteValue { index: 1 })
        ));
        assert!(validate_vector(&[0.0, 0.0]).is_ok());
    }
}
