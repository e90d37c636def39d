//! Response-length statistics over formatted samples.
//!
//! Token counts are estimated at four characters per token, a rough fit for
//! the target language. Samples without a complete model turn count as zero
//! tokens.

use crate::model::FormattedSample;
use crate::template;

pub const CHARS_PER_TOKEN: usize = 4;
pub const SHORT_TOKENS: usize = 30;
pub const LONG_TOKENS: usize = 200;

/// Share of too-short answers above which the CLI warns that the dataset
/// needs richer responses.
pub const SHORT_SHARE_WARNING: f32 = 0.3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LengthStats {
    pub too_short: usize,
    pub optimal: usize,
    pub too_long: usize,
    pub total: usize,
}

fn estimated_tokens(sample: &FormattedSample) -> usize {
    let answer = template::extract_answer(&sample.text).unwrap_or("");
    answer.chars().count() / CHARS_PER_TOKEN
}

impl LengthStats {
    pub fn from_samples(samples: &[FormattedSample]) -> Self {
        let mut stats = Self {
            total: samples.len(),
            ..Self::default()
        };

        for sample in samples {
            let tokens = estimated_tokens(sample);
            if tokens < SHORT_TOKENS {
                stats.too_short += 1;
            } else if tokens <= LONG_TOKENS {
                stats.optimal += 1;
            } else {
                stats.too_long += 1;
            }
        }

        stats
    }

    pub fn share(&self, count: usize) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            count as f32 / self.total as f32
        }
    }

    pub fn short_share(&self) -> f32 {
        self.share(self.too_short)
    }
}
