//! AI interpretation, image generation, and quota interfaces.

use crate::error::{EngineError, EngineResult};
use crate::remote::{RemoteError, RemoteResult};
use oneiro_model::DreamAnalysis;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// The external AI service.
///
/// Interpretation and image generation are independent calls; the analysis
/// orchestrator runs them concurrently and tolerates image failure alone.
pub trait AiService: Send + Sync {
    /// Interprets a transcript into structured analysis fields.
    fn analyze(&self, transcript: &str, lang: Option<&str>) -> RemoteResult<DreamAnalysis>;

    /// Generates a companion image, optionally replacing an existing one.
    fn generate_image(&self, transcript: &str, existing_url: Option<&str>)
        -> RemoteResult<String>;
}

/// Tier-based quota over AI analysis invocations.
///
/// Checked before each analysis request; invalidated after a successful one
/// so any cached count is re-fetched.
pub trait QuotaService: Send + Sync {
    /// Whether the current plan allows another analysis.
    fn can_analyze_dream(&self) -> EngineResult<bool>;

    /// Drops any cached quota count.
    fn invalidate(&self);

    /// The typed error raised when the quota denies an analysis.
    fn quota_error(&self) -> EngineError {
        EngineError::QuotaExceeded {
            message: "You have reached your dream analysis limit for this period".into(),
            upgrade_eligible: true,
        }
    }
}

/// A mock AI service with scripted results.
#[derive(Debug, Default)]
pub struct MockAiService {
    analyze_error: Mutex<Option<RemoteError>>,
    image_error: Mutex<Option<RemoteError>>,
    analyze_calls: AtomicU64,
    image_calls: AtomicU64,
    last_lang: Mutex<Option<String>>,
}

impl MockAiService {
    /// Creates a mock where both calls succeed with fixture output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next analyze call fail.
    pub fn fail_next_analyze(&self, error: RemoteError) {
        *self.analyze_error.lock() = Some(error);
    }

    /// Makes the next image call fail.
    pub fn fail_next_image(&self, error: RemoteError) {
        *self.image_error.lock() = Some(error);
    }

    /// Number of analyze calls made.
    pub fn analyze_calls(&self) -> u64 {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    /// Number of image calls made.
    pub fn image_calls(&self) -> u64 {
        self.image_calls.load(Ordering::SeqCst)
    }

    /// Language passed to the most recent analyze call.
    pub fn last_lang(&self) -> Option<String> {
        self.last_lang.lock().clone()
    }
}

impl AiService for MockAiService {
    fn analyze(&self, transcript: &str, lang: Option<&str>) -> RemoteResult<DreamAnalysis> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_lang.lock() = lang.map(str::to_string);
        if let Some(error) = self.analyze_error.lock().take() {
            return Err(error);
        }
        Ok(DreamAnalysis {
            title: format!("Dream of {}", transcript.chars().take(16).collect::<String>()),
            interpretation: "A reflection of the day's residue".into(),
            shareable_quote: "Every dream is a letter to oneself".into(),
            theme: "reflection".into(),
            dream_type: "ordinary".into(),
            image_prompt: format!("dreamlike scene: {transcript}"),
        })
    }

    fn generate_image(
        &self,
        _transcript: &str,
        existing_url: Option<&str>,
    ) -> RemoteResult<String> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.image_error.lock().take() {
            return Err(error);
        }
        Ok(existing_url
            .map(str::to_string)
            .unwrap_or_else(|| "https://img.example.com/generated.png".into()))
    }
}

/// A mock quota service.
#[derive(Debug)]
pub struct MockQuotaService {
    allowed: AtomicBool,
    invalidations: AtomicU64,
    checks: AtomicU64,
}

impl MockQuotaService {
    /// Creates a quota that allows analysis.
    pub fn allowing() -> Self {
        Self {
            allowed: AtomicBool::new(true),
            invalidations: AtomicU64::new(0),
            checks: AtomicU64::new(0),
        }
    }

    /// Creates a quota that denies analysis.
    pub fn denying() -> Self {
        let quota = Self::allowing();
        quota.allowed.store(false, Ordering::SeqCst);
        quota
    }

    /// Switches the decision.
    pub fn set_allowed(&self, allowed: bool) {
        self.allowed.store(allowed, Ordering::SeqCst);
    }

    /// Number of invalidate calls.
    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::SeqCst)
    }

    /// Number of quota checks performed.
    pub fn checks(&self) -> u64 {
        self.checks.load(Ordering::SeqCst)
    }
}

impl QuotaService for MockQuotaService {
    fn can_analyze_dream(&self) -> EngineResult<bool> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.allowed.load(Ordering::SeqCst))
    }

    fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}
