pub mod documents;
pub mod feedback;
pub mod liveness;
pub mod qa;
pub mod readiness;
