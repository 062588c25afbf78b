pub mod instrument;
pub mod sample;
