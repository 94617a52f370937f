mod trigram;

use std::sync::Arc;

use polyspell_core::{detection_sample, DetectionResult, LanguageCode};
use tracing::debug;

use crate::error::{Result, SpellError};
pub use trigram::WhatlangGuesser;

/// Guesses the language of a text sample. Implementations may be slow;
/// callers run them off the input path.
pub trait LanguageGuesser: Send + Sync {
    fn detect(&self, text: &str) -> anyhow::Result<DetectionResult>;
}

/// Runs `guesser` on a blocking worker over the tail of `text` and applies
/// the reliability rule. Failures and unreliable guesses both yield `None`.
pub async fn guess_language(
    guesser: Arc<dyn LanguageGuesser>,
    text: &str,
    sample_len: usize,
    min_reliability: u8,
) -> Option<LanguageCode> {
    let sample = detection_sample(text, sample_len).to_string();
    let outcome = tokio::task::spawn_blocking(move || guesser.detect(&sample)).await;

    let detected = match outcome {
        Ok(Ok(detected)) => detected,
        Ok(Err(error)) => {
            debug!("language detection failed: {error:#}");
            return None;
        }
        Err(error) => {
            debug!("language detection task failed: {error}");
            return None;
        }
    };

    match accept(&detected, min_reliability) {
        Ok(language) => Some(language),
        Err(error) => {
            debug!(?detected, "{error}");
            None
        }
    }
}

fn accept(detected: &DetectionResult, min_reliability: u8) -> Result<LanguageCode> {
    detected
        .accepted_language(min_reliability)
        .ok_or(SpellError::DetectionUnreliable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedGuesser;

    #[tokio::test]
    async fn reliable_guess_is_accepted() {
        let guesser = Arc::new(FixedGuesser::reliable("fr", 96));
        let language = guess_language(guesser.clone(), "bonjour tout le monde", 256, 85).await;
        assert_eq!(language.unwrap().as_str(), "fr");
        assert_eq!(guesser.samples(), vec!["bonjour tout le monde".to_string()]);
    }

    #[tokio::test]
    async fn low_confidence_is_swallowed() {
        let guesser = Arc::new(FixedGuesser::reliable("fr", 60));
        assert!(guess_language(guesser, "bonjour", 256, 85).await.is_none());
    }

    #[test]
    fn unreliable_flag_is_rejected_even_with_high_percent() {
        let detected = DetectionResult {
            reliable: false,
            languages: vec![polyspell_core::LanguageGuess {
                code: "de".to_string(),
                percent: 99,
            }],
        };
        assert!(matches!(accept(&detected, 85), Err(SpellError::DetectionUnreliable)));
        assert!(matches!(
            accept(&DetectionResult::unreliable(), 85),
            Err(SpellError::DetectionUnreliable)
        ));
    }

    #[tokio::test]
    async fn errors_are_swallowed() {
        let guesser = Arc::new(FixedGuesser::failing());
        assert!(guess_language(guesser, "bonjour", 256, 85).await.is_none());
    }

    #[tokio::test]
    async fn only_the_tail_is_submitted() {
        let guesser = Arc::new(FixedGuesser::reliable("en", 99));
        let text = "x".repeat(300) + "tail";
        guess_language(guesser.clone(), &text, 256, 85).await;
        let samples = guesser.samples();
        assert_eq!(samples[0].chars().count(), 256);
        assert!(samples[0].ends_with("tail"));
    }
}
