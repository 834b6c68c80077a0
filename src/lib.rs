//! SafeLens - launch API security scans and track their status
//!
//! SafeLens collects target URLs (or an uploaded URL sheet) and a test
//! selection, records a scan test for the signed-in user, and hands the job
//! to an external automation webhook that does the actual scanning. Results
//! come back through the record store and are mirrored live.
//!
//! ## Flow
//!
//! 1. [`workflow::SubmissionWorkflow`] validates a [`workflow::SubmissionForm`]
//! 2. [`store::TestStore::create`] persists a pending [`ApiTest`]
//! 3. [`dispatch::AnalysisDispatch`] sends the job, embedding the record id
//! 4. The automation workflow updates the row ([`ProcessorUpdate`])
//! 5. [`reconcile::FeedRunner`] merges the change and announces completion

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod identity;
pub mod reconcile;
pub mod store;
pub mod workflow;

pub use domain::*;
