//! Carousel configuration
//!
//! The ordered list of documents, how often each slot advances, and how often
//! every document is reloaded from its source.

use std::time::Duration;

use crate::coordinator::REFERENCE_SCALE;

/// Advance interval used when a slot does not set its own
pub const DEFAULT_ADVANCE_INTERVAL: Duration = Duration::from_secs(15);

/// Interval between document reloads
pub const DEFAULT_RELOAD_INTERVAL: Duration = Duration::from_secs(60);

/// Number of documents shown by default
pub const DEFAULT_DOCUMENT_COUNT: usize = 6;

/// One configured document
#[derive(Debug, Clone, PartialEq)]
pub struct SlotConfig {
    /// Document URL (local path or `http(s)://` URL)
    pub url: String,
    /// Time between page flips
    pub advance_interval: Duration,
}

impl SlotConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            advance_interval: DEFAULT_ADVANCE_INTERVAL,
        }
    }

    pub fn with_advance_interval(mut self, interval: Duration) -> Self {
        self.advance_interval = interval;
        self
    }
}

/// Configuration of a [`Carousel`](crate::Carousel)
#[derive(Debug, Clone, PartialEq)]
pub struct CarouselConfig {
    /// Documents in display order; slot `i` shows `slots[i]`
    pub slots: Vec<SlotConfig>,
    /// Time between full reloads of every document
    pub reload_interval: Duration,
    /// Scale of the baseline viewport used for fitting
    pub reference_scale: f32,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            slots: (1..=DEFAULT_DOCUMENT_COUNT)
                .map(|n| SlotConfig::new(format!("pdfs/{n}.pdf")))
                .collect(),
            reload_interval: DEFAULT_RELOAD_INTERVAL,
            reference_scale: REFERENCE_SCALE,
        }
    }
}

impl CarouselConfig {
    /// Documents at `urls`, each advancing every [`DEFAULT_ADVANCE_INTERVAL`].
    pub fn with_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            slots: urls.into_iter().map(SlotConfig::new).collect(),
            ..Self::default()
        }
    }

    /// Sets the same advance interval on every slot.
    pub fn with_advance_interval(mut self, interval: Duration) -> Self {
        for slot in &mut self.slots {
            slot.advance_interval = interval;
        }
        self
    }

    pub fn with_reload_interval(mut self, interval: Duration) -> Self {
        self.reload_interval = interval;
        self
    }

    pub fn with_reference_scale(mut self, scale: f32) -> Self {
        self.reference_scale = scale;
        self
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|slot| slot.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CarouselConfig::default();
        let urls: Vec<_> = config.urls().collect();
        assert_eq!(
            urls,
            [
                "pdfs/1.pdf",
                "pdfs/2.pdf",
                "pdfs/3.pdf",
                "pdfs/4.pdf",
                "pdfs/5.pdf",
                "pdfs/6.pdf"
            ]
        );
        assert!(config
            .slots
            .iter()
            .all(|slot| slot.advance_interval == Duration::from_secs(15)));
        assert_eq!(config.reload_interval, Duration::from_secs(60));
        assert_eq!(config.reference_scale, 1.5);
    }

    #[test]
    fn test_builders() {
        let config = CarouselConfig::with_urls(["a.pdf", "b.pdf"])
            .with_advance_interval(Duration::from_secs(5))
            .with_reload_interval(Duration::from_secs(30))
            .with_reference_scale(1.0);

        assert_eq!(config.slots.len(), 2);
        assert_eq!(config.slots[1].advance_interval, Duration::from_secs(5));
        assert_eq!(config.reload_interval, Duration::from_secs(30));
        assert_eq!(config.reference_scale, 1.0);
    }
}
