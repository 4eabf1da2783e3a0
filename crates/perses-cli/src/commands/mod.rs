pub mod order;
pub mod propose;
