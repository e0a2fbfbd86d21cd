//! Short identifier generation with collision retry.

use rand::Rng;
use serde_json::json;
use std::sync::Arc;

use crate::domain::entities::ResourceKind;
use crate::domain::repositories::ResourceRepository;
use crate::error::AppError;

/// Symbols used in identifiers. Excludes `0 O o 1 l I` so codes survive being
/// read aloud or retyped from a printed label.
pub const CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz";

pub const DEFAULT_CODE_LENGTH: usize = 7;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Draws a random code of `length` symbols from [`CODE_ALPHABET`].
pub fn random_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Returns `true` if `code` could have been produced by [`random_code`].
pub fn is_well_formed(code: &str) -> bool {
    !code.is_empty() && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

/// Produces identifiers that are free within a kind at the time of the check.
///
/// The check and the later insert are separate round trips; the insert's
/// uniqueness constraint remains the final arbiter.
pub struct IdentifierGenerator {
    repository: Arc<dyn ResourceRepository>,
    length: usize,
    max_attempts: u32,
}

impl IdentifierGenerator {
    pub fn new(repository: Arc<dyn ResourceRepository>, length: usize, max_attempts: u32) -> Self {
        Self {
            repository,
            length,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Generates a code not currently used by `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::DuplicateId`] after `max_attempts` consecutive
    /// collisions, and [`AppError::Unavailable`] if the durable store cannot
    /// be queried.
    pub async fn generate(&self, kind: ResourceKind) -> Result<String, AppError> {
        for attempt in 1..=self.max_attempts {
            let code = random_code(self.length);

            if !self.repository.exists_id(kind, &code).await? {
                return Ok(code);
            }

            tracing::debug!(%kind, attempt, "Identifier collision");
            metrics::counter!("identifier_collisions_total", "kind" => kind.as_str()).increment(1);
        }

        tracing::error!(
            %kind,
            attempts = self.max_attempts,
            length = self.length,
            "Identifier space exhausted"
        );

        Err(AppError::duplicate_id(
            "Failed to generate a unique identifier",
            json!({ "kind": kind, "attempts": self.max_attempts }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockResourceRepository;
    use std::collections::HashSet;

    #[test]
    fn test_alphabet_has_no_ambiguous_symbols() {
        assert_eq!(CODE_ALPHABET.len(), 56);
        for c in b"0Oo1lI" {
            assert!(!CODE_ALPHABET.contains(c), "{} is ambiguous", *c as char);
        }
    }

    #[test]
    fn test_random_code_shape() {
        let code = random_code(DEFAULT_CODE_LENGTH);
        assert_eq!(code.len(), DEFAULT_CODE_LENGTH);
        assert!(is_well_formed(&code));
    }

    #[test]
    fn test_random_codes_are_distinct() {
        let codes: HashSet<String> = (0..1000).map(|_| random_code(DEFAULT_CODE_LENGTH)).collect();
        assert_eq!(codes.len(), 1000);
    }

    #[test]
    fn test_is_well_formed() {
        assert!(is_well_formed("abc234"));
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("abc0"));
        assert!(!is_well_formed("abc-23"));
    }

    #[tokio::test]
    async fn test_generate_returns_first_free_code() {
        let mut repo = MockResourceRepository::new();
        repo.expect_exists_id().times(1).returning(|_, _| Ok(false));

        let generator = IdentifierGenerator::new(Arc::new(repo), 7, 8);
        let code = generator.generate(ResourceKind::ShortLink).await.unwrap();

        assert_eq!(code.len(), 7);
    }

    #[tokio::test]
    async fn test_generate_retries_on_collision() {
        let mut repo = MockResourceRepository::new();
        let mut calls = 0;
        repo.expect_exists_id().times(3).returning(move |_, _| {
            calls += 1;
            Ok(calls < 3)
        });

        let generator = IdentifierGenerator::new(Arc::new(repo), 7, 8);

        assert!(generator.generate(ResourceKind::QrCode).await.is_ok());
    }

    #[tokio::test]
    async fn test_generate_exhaustion_is_duplicate_id() {
        let mut repo = MockResourceRepository::new();
        repo.expect_exists_id().times(8).returning(|_, _| Ok(true));

        let generator = IdentifierGenerator::new(Arc::new(repo), 7, 8);
        let err = generator.generate(ResourceKind::Barcode).await.unwrap_err();

        assert!(matches!(err, AppError::DuplicateId { .. }));
    }

    #[tokio::test]
    async fn test_generate_propagates_store_failure() {
        let mut repo = MockResourceRepository::new();
        repo.expect_exists_id()
            .returning(|_, _| Err(AppError::unavailable("down", json!({}))));

        let generator = IdentifierGenerator::new(Arc::new(repo), 7, 8);
        let err = generator.generate(ResourceKind::ShortLink).await.unwrap_err();

        assert!(matches!(err, AppError::Unavailable { .. }));
    }
}
