pub mod activity;
pub mod catalog;
pub mod recommendation;
pub mod snapshot;
