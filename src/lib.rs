// library crate for condwatch
// exposes the condition engine to embedders and the condwatch binary

pub mod cli;
pub mod conditions;
pub mod config;
