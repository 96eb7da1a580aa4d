pub mod documents;
pub mod normalize;
pub mod profile;
pub mod provider;
pub mod queue;
pub mod reconcile;
pub mod status_map;
pub mod submission;
