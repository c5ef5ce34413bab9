//! Webhook-triggered model retraining.
//!
//! `POST /notify` hands a batch to the [`coordinator`], which retrains the
//! [`model`] under a deadline and posts the resulting metrics through the
//! [`notifier`].

pub mod coordinator;
pub mod error;
pub mod ingress;
pub mod model;
pub mod notifier;
pub mod settings;
pub mod subcommands;
pub mod utils;

#[cfg(test)]
mod testing;

pub use coordinator::{Coordinator, Outcome, RetrainQueue, RetrainReport, RetrainSettings, Stage};
pub use model::{DataBatch, MetricsSnapshot, Model, ModelConfig, SharedModel};
pub use notifier::{Notifier, NotifierConfig};
pub use settings::ServiceSettings;
