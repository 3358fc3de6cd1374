pub mod adapters;
pub mod agent;
pub mod clients;
pub mod content_filter;
pub mod errors;
pub mod models;
pub mod prompt_template;
pub mod providers;
