use docctx_core::traits::TokenEstimator;

/// `ceil(chars / chars_per_token)`, independent of the model.
#[derive(Debug, Clone, Copy)]
pub struct CharRatioEstimator {
    chars_per_token: usize,
}

impl CharRatioEstimator {
    pub fn new(chars_per_token: usize) -> Self { Self { chars_per_token: chars_per_token.max(1) } }

    pub fn count(&self, text: &str) -> usize { text.chars().count().div_ceil(self.chars_per_token) }
}

impl Default for CharRatioEstimator {
    fn default() -> Self { Self::new(4) }
}

impl TokenEstimator for CharRatioEstimator {
    fn estimate(&self, text: &str, _model: &str) -> usize { self.count(text) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_partial_tokens() {
        let e = CharRatioEstimator::new(4);
        assert_eq!(e.count(""), 0);
        assert_eq!(e.count("abc"), 1);
        assert_eq!(e.count("abcd"), 1);
        assert_eq!(e.count("abcde"), 2);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let e = CharRatioEstimator::new(2);
        assert_eq!(e.count("ééé"), 2);
    }

    #[test]
    fn zero_ratio_is_treated_as_one() {
        assert_eq!(CharRatioEstimator::new(0).count("abc"), 3);
    }
}
