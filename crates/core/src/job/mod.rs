//! Job and batch data model.
//!
//! A [`JobDescriptor`] is the immutable request for one uploaded file. Every
//! descriptor handed to the orchestrator yields exactly one [`JobOutcome`],
//! and a [`BatchResult`] keeps those outcomes in input order.

mod types;

pub use types::{
    BatchResult, ErrorKind, JobDescriptor, JobOutcome, JobPayload, ParseFormatError, TargetFormat,
};
