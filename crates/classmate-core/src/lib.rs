//! Core logic for classmate.
//!
//! - [`model`]: the generative-model adapter trait and the Gemini client.
//! - [`flows`]: one module per teacher-facing generation flow (lesson plans,
//!   assessments, essay grading, differentiated activities, materials).
//! - [`schedule`]: validation and persistence of schedule events.
//! - [`report`], [`quiz`], [`style_guide`]: the small pieces of local logic
//!   the flows and the CLI share.

pub mod error;
pub mod files;
pub mod flows;
pub mod model;
pub mod quiz;
pub mod report;
pub mod schedule;
pub mod style_guide;
pub mod validate;

pub use error::FlowError;
pub use model::{GenerationRequest, GenerativeModel};
