//! Short links for recipes.
//!
//! A recipe id is turned into a short opaque token with the Hashids scheme (through
//! the `harsh` crate): the alphabet is shuffled by a secret salt and tokens are padded
//! to a minimum length. Decoded tokens are re-encoded and compared, so only canonical
//! tokens are accepted.
//!
//! [`ShortLinkCodec`] is pure. [`short_link_for_recipe`] and [`resolve_short_link`]
//! combine it with recipe lookups.

use crate::{
    config::settings::ShortLinkSettings,
    entities::{Recipe, recipe},
    errors::{Error, Result},
};
use harsh::Harsh;
use sea_orm::{ConnectionTrait, EntityTrait};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Alphabet used when none is configured.
pub const DEFAULT_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890";
const MIN_ALPHABET_LENGTH: usize = 16;
// Longest unpadded single-number token: lottery, guards and a u64 in base >= 10.
const MAX_UNPADDED_LENGTH: usize = 32;

/// Reversible integer <-> token transform.
pub struct ShortLinkCodec {
    harsh: Harsh,
    alphabet: HashSet<char>,
    min_length: usize,
}

impl fmt::Debug for ShortLinkCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortLinkCodec")
            .field("min_length", &self.min_length)
            .field("alphabet_len", &self.alphabet.len())
            .finish_non_exhaustive()
    }
}

impl ShortLinkCodec {
    /// Builds a codec from a salt, a minimum token length and an alphabet.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the alphabet has fewer than 16 distinct
    /// characters, contains whitespace or non-ASCII characters.
    pub fn new(salt: &str, min_length: usize, alphabet: &str) -> Result<Self> {
        let unique: HashSet<char> = alphabet.chars().collect();
        if unique.len() < MIN_ALPHABET_LENGTH {
            return Err(Error::Config {
                message: format!(
                    "short link alphabet needs at least {MIN_ALPHABET_LENGTH} distinct characters"
                ),
            });
        }
        if unique.iter().any(|c| c.is_whitespace() || !c.is_ascii()) {
            return Err(Error::Config {
                message: "short link alphabet must be printable ASCII without whitespace"
                    .to_string(),
            });
        }

        let harsh = Harsh::builder()
            .salt(salt)
            .length(min_length)
            .alphabet(alphabet)
            .build()
            .map_err(|e| Error::Config {
                message: format!("invalid short link settings: {e}"),
            })?;

        Ok(Self {
            harsh,
            alphabet: unique,
            min_length,
        })
    }

    /// Builds a codec from the `[short_link]` settings.
    pub fn from_settings(settings: &ShortLinkSettings) -> Result<Self> {
        Self::new(&settings.salt, settings.min_length, &settings.alphabet)
    }

    /// Encodes a single id.
    #[must_use]
    pub fn encode(&self, id: u64) -> String {
        self.harsh.encode(&[id])
    }

    /// Encodes a sequence of numbers into one token.
    #[must_use]
    pub fn encode_numbers(&self, numbers: &[u64]) -> String {
        self.harsh.encode(numbers)
    }

    /// Decodes a token produced by [`Self::encode`].
    ///
    /// # Errors
    /// Returns [`Error::InvalidToken`] for anything that is not the canonical encoding
    /// of exactly one number. Never panics on malformed input.
    pub fn decode(&self, token: &str) -> Result<u64> {
        match self.decode_numbers(token).as_deref() {
            Some([id]) => Ok(*id),
            _ => Err(Error::InvalidToken {
                token: token.to_string(),
            }),
        }
    }

    /// Decodes a token into its numbers, or `None` if the token is not canonical.
    #[must_use]
    pub fn decode_numbers(&self, token: &str) -> Option<Vec<u64>> {
        if token.is_empty()
            || token.len() > self.min_length.max(MAX_UNPADDED_LENGTH)
            || !token.chars().all(|c| self.alphabet.contains(&c))
        {
            return None;
        }
        let numbers = self.harsh.decode(token).ok()?;
        (!numbers.is_empty() && self.harsh.encode(&numbers) == token).then_some(numbers)
    }
}

/// Returns the short-link token for an existing recipe.
///
/// # Errors
/// Returns [`Error::NotFound`] if the recipe does not exist.
pub async fn short_link_for_recipe<C>(
    db: &C,
    codec: &ShortLinkCodec,
    recipe_id: i64,
) -> Result<String>
where
    C: ConnectionTrait,
{
    let recipe = Recipe::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Recipe", recipe_id))?;
    let id = u64::try_from(recipe.id).map_err(|_| Error::not_found("Recipe", recipe_id))?;
    Ok(codec.encode(id))
}

/// Resolves a short-link token to its recipe.
///
/// # Errors
/// - [`Error::InvalidToken`] if the token is malformed or tampered with
/// - [`Error::NotFound`] if it decodes to an id with no recipe
pub async fn resolve_short_link<C>(
    db: &C,
    codec: &ShortLinkCodec,
    token: &str,
) -> Result<recipe::Model>
where
    C: ConnectionTrait,
{
    let decoded = codec.decode(token)?;
    let recipe_id = i64::try_from(decoded).map_err(|_| Error::InvalidToken {
        token: token.to_string(),
    })?;
    debug!("Short link {} resolved to recipe {}", token, recipe_id);
    Recipe::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Recipe", recipe_id))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn codec() -> ShortLinkCodec {
        ShortLinkCodec::new("Testing_salt", 4, DEFAULT_ALPHABET).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let codec = codec();
        for id in [0, 1, 42, 999_999, u64::from(u32::MAX), u64::MAX] {
            let token = codec.encode(id);
            assert!(token.chars().count() >= 4, "{token} is too short");
            assert!(token.chars().all(|c| DEFAULT_ALPHABET.contains(c)));
            assert_eq!(codec.decode(&token).unwrap(), id);
        }
    }

    #[test]
    fn test_encoding_is_deterministic_and_salted() {
        let token = codec().encode(42);
        assert_eq!(codec().encode(42), token);
        assert_ne!(codec().encode(43), token);

        let other = ShortLinkCodec::new("another salt", 4, DEFAULT_ALPHABET).unwrap();
        assert_ne!(other.encode(42), token);
        assert!(other.decode(&token).is_err() || other.decode(&token).unwrap() != 42);
    }

    #[test]
    fn test_reference_vectors() {
        let codec = ShortLinkCodec::new("this is my salt", 0, DEFAULT_ALPHABET).unwrap();
        assert_eq!(codec.encode(12345), "NkK9");
        assert_eq!(codec.encode_numbers(&[1, 2, 3]), "laHquq");
        assert_eq!(codec.decode_numbers("laHquq"), Some(vec![1, 2, 3]));

        let padded = ShortLinkCodec::new("this is my salt", 8, DEFAULT_ALPHABET).unwrap();
        assert_eq!(padded.encode(1), "gB0NV05e");
        assert_eq!(padded.decode("gB0NV05e").unwrap(), 1);
    }

    #[test]
    fn test_min_length_padding() {
        let codec = ShortLinkCodec::new("Testing_salt", 12, DEFAULT_ALPHABET).unwrap();
        for id in [1, 7, 123_456] {
            let token = codec.encode(id);
            assert_eq!(token.chars().count(), 12);
            assert_eq!(codec.decode(&token).unwrap(), id);
        }
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let codec = codec();
        for token in [
            "!!!notavalidtoken!!!",
            "",
            "    ",
            "ÿÿÿÿ",
            "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz",
        ] {
            assert!(
                matches!(codec.decode(token), Err(Error::InvalidToken { .. })),
                "{token:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_tampered_token_rejected() {
        let codec = codec();
        let token = codec.encode(42);
        let mut chars: Vec<char> = token.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == 'a' { 'b' } else { 'a' };
        let tampered: String = chars.into_iter().collect();
        if let Ok(id) = codec.decode(&tampered) {
            assert_ne!(id, 42);
            assert_eq!(codec.encode(id), tampered);
        }
    }

    #[test]
    fn test_multiple_numbers_are_not_a_recipe_id() {
        let codec = codec();
        let token = codec.encode_numbers(&[1, 2]);
        assert_eq!(codec.decode_numbers(&token), Some(vec![1, 2]));
        assert!(matches!(
            codec.decode(&token),
            Err(Error::InvalidToken { .. })
        ));
    }

    #[test]
    fn test_short_alphabet_rejected() {
        let result = ShortLinkCodec::new("salt", 4, "abcdefgh");
        assert!(matches!(result, Err(Error::Config { .. })));
        let result = ShortLinkCodec::new("salt", 4, "abcdefghijklmnop qrstuvwxyz");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_resolve_short_link_integration() -> Result<()> {
        let (db, author) = setup_with_user().await?;
        let flour = create_test_ingredient(&db, "Flour", crate::entities::MeasurementUnit::Grams)
            .await?;
        let recipe = create_test_recipe(&db, author.id, "Bread", &[(flour.id, 500)]).await?;
        let codec = codec();

        let token = short_link_for_recipe(&db, &codec, recipe.id).await?;
        let resolved = resolve_short_link(&db, &codec, &token).await?;
        assert_eq!(resolved.id, recipe.id);

        // Structurally valid token for an id that has no recipe
        let missing = codec.encode(999_999);
        assert!(matches!(
            resolve_short_link(&db, &codec, &missing).await,
            Err(Error::NotFound { .. })
        ));

        assert!(matches!(
            resolve_short_link(&db, &codec, "!!!notavalidtoken!!!").await,
            Err(Error::InvalidToken { .. })
        ));

        assert!(matches!(
            short_link_for_recipe(&db, &codec, 999_999).await,
            Err(Error::NotFound { .. })
        ));

        Ok(())
    }
}
