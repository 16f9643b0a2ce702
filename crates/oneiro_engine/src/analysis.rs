//! Analysis orchestration: concurrent interpretation + image generation.

use crate::ai::AiService;
use crate::remote::{RemoteError, RemoteResult};
use oneiro_model::DreamAnalysis;

/// Joined results of one analysis request.
///
/// The two calls run concurrently and are joined before the store performs
/// its single state update, so the record never reflects a half-finished
/// analysis.
pub(crate) struct AnalysisOutcome {
    pub analysis: RemoteResult<DreamAnalysis>,
    pub image: RemoteResult<String>,
}

/// Runs interpretation and image generation concurrently.
///
/// The calls write disjoint fields, merged afterward by the store in one
/// synchronous update. A panicked worker is reported as a server error so
/// the partial-failure policy still applies.
pub(crate) fn run_analysis(
    ai: &dyn AiService,
    transcript: &str,
    existing_url: Option<&str>,
    lang: Option<&str>,
) -> AnalysisOutcome {
    std::thread::scope(|scope| {
        let interpret = scope.spawn(|| ai.analyze(transcript, lang));
        let image = scope.spawn(|| ai.generate_image(transcript, existing_url));

        AnalysisOutcome {
            analysis: interpret
                .join()
                .unwrap_or_else(|_| Err(RemoteError::Server("interpretation worker panicked".into()))),
            image: image
                .join()
                .unwrap_or_else(|_| Err(RemoteError::Server("image worker panicked".into()))),
        }
    })
}
