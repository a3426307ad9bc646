pub mod arguments;
pub mod artifact;
pub mod config;
pub mod deploy;
pub mod node;
pub mod output;
pub mod run;
