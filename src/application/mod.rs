pub mod drift;
pub mod generate;
