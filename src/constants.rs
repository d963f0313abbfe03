//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Chunking constants
pub mod chunking {
    /// Default maximum chunk size in bytes (pre-overlap core)
    pub const DEFAULT_CHUNK_SIZE: usize = 1000;

    /// Default overlap carried from the previous chunk, in bytes
    pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

    /// Separator cascade, coarsest first. The empty string terminates the
    /// recursion with a fixed-width character split.
    pub const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "! ", "? ", "; ", ", ", " ", ""];

    /// Documents whose extracted text trims below this length are rejected
    /// before chunking.
    pub const MIN_DOCUMENT_CHARS: usize = 10;
}

/// Retrieval constants
pub mod retrieval {
    /// Default number of hits returned by a search
    pub const DEFAULT_TOP_K: usize = 5;

    /// Hits the research stage requests when grounding a task
    pub const RESEARCH_TOP_K: usize = 10;

    /// Default minimum similarity score for a hit to be returned
    pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.3;

    /// Default upper bound on the rendered context block, in bytes
    pub const DEFAULT_CONTEXT_MAX_LENGTH: usize = 4000;

    /// Context budget granted to the research stage
    pub const RESEARCH_CONTEXT_MAX_LENGTH: usize = 6000;

    /// Returned by the context builder when no hits are supplied
    pub const NO_RESULTS_FALLBACK: &str = "No relevant information found.";
}

/// Embedding gateway constants
pub mod embedding {
    /// Maximum inputs sent per embedding request
    pub const MAX_BATCH_SIZE: usize = 128;

    /// Maximum retry attempts for a transient embedding failure
    pub const MAX_RETRIES: usize = 3;

    /// Base delay for embedding retry backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 500;
}

/// Stage executor constants
pub mod executor {
    /// Continuation attempts allowed after a length-limited first response
    pub const MAX_CONTINUATIONS: usize = 2;

    /// Tail of accumulated content replayed in a continuation prompt
    pub const CONTINUATION_TAIL_CHARS: usize = 500;
}

/// Pipeline progress milestones (percent)
pub mod progress {
    pub const RESEARCH_START: u8 = 0;
    pub const RESEARCH_DONE: u8 = 33;
    pub const PLAN_DONE: u8 = 66;
    pub const REVIEW_DONE: u8 = 100;
}
