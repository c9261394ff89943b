pub mod money;
pub mod recorder;
