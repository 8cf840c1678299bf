//! Route handlers. Each runs synchronously against the store once the
//! transport has delivered the request; multi-record writes share one
//! transaction.

pub mod assessments;
pub mod candidates;
pub mod jobs;
pub mod users;
