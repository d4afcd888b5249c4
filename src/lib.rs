pub mod catalog;
pub mod config;
pub mod error;
pub mod features;
pub mod geocoding;
pub mod images;
pub mod models;
pub mod persistence;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod upload;
pub mod wizard;

pub use config::WizardConfig;
pub use session::WizardSession;
