pub mod export;
pub mod fetch;
