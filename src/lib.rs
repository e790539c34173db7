//! Studyforge: schema-typed generation flows for education content
//!
//! Every operation is a flow with typed input and output contracts, a prompt template,
//! and a generation backend behind [`provider::GenerationClient`]. Composers in
//! [`pipelines`] chain flows into tutoring answers, coding exercises, illustrated notes,
//! slide decks and narration.

pub mod cli;
pub mod config;
pub mod error;
pub mod flow;
pub mod logging;
pub mod markup;
pub mod pipelines;
pub mod prompt;
pub mod provider;
pub mod schema;
pub mod throttle;
