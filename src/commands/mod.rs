pub mod annotate;
pub mod batch;
pub mod chunk;
pub mod features;
pub mod inventory;
pub mod outline;
pub mod predict;
