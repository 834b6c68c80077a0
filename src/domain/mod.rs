//! Core domain types for SafeLens

mod api_test;
mod attachment;
mod profile;

pub use api_test::{
    ApiTest, CorsMode, NewApiTest, ProcessorUpdate, TestResultSummary, TestStatistics,
    TestStatus, TestType, TransitionError,
};
pub use attachment::Attachment;
pub use profile::{ProfileDraft, UserProfile};
