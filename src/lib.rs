//! # engagement-lab: A/B Winner Selection and Retention Prediction
//!
//! **Version**: 0.1.0
//!
//! Decision cores for a short-form content pipeline:
//!
//! - [`experiment`]: creates A/B experiments over content variants and picks
//!   a winner with a pooled two-proportion z-test
//! - [`retention`]: estimates video completion rate with a gradient-boosted
//!   tree ensemble and turns the estimate into a risk tier and suggestions
//!
//! Both cores are synchronous and side-effect free. The agent shells around
//! them ([`experiment::ExperimentManager`], [`retention::RetentionPredictor`])
//! take their cache, metrics feed and notification sink as injected handles.
//!
//! ## Example Usage
//!
//! ```rust
//! use engagement_lab::experiment::{DecisionKind, VariantMetricRecord, WinnerSelector};
//!
//! let selector = WinnerSelector::new(100, 0.95);
//! let control = VariantMetricRecord::new("control", 500, 0.05)?;
//! let challenger = VariantMetricRecord::new("challenger", 500, 0.09)?;
//!
//! let decision = selector.select(&control, &[challenger]);
//! assert_eq!(decision.winner(), Some("challenger"));
//! assert_eq!(decision.kind(), DecisionKind::Significant);
//! assert!(decision.confidence() >= 0.95);
//! # Ok::<(), engagement_lab::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod experiment;
pub mod kv;
pub mod notify;
pub mod retention;

pub use error::{Error, Result};
