mod client;
mod links;
mod progress_bar;
mod provider;
mod types;

pub use provider::AzureDevOpsProvider;
