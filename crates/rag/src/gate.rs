//! Confidence gate.

use crate::state::RequestState;
use serde::Serialize;

/// Minimum confidence for a question to be answered by the generator.
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Branch taken after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Generate,
    Fallback,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Choose the branch for a validated state.
pub fn decide_route(state: &RequestState) -> Route {
    route_for(state.confidence())
}

/// `Generate` at or above the threshold, `Fallback` below it (and for NaN).
pub fn route_for(confidence: f32) -> Route {
    if confidence >= CONFIDENCE_THRESHOLD {
        Route::Generate
    } else {
        Route::Fallback
    }
}
