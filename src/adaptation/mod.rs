pub mod adapter;
pub mod feedback;
pub mod weights;
