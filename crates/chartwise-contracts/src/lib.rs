pub mod analysis;
pub mod catalog;
pub mod chat;
pub mod events;
pub mod locale;
pub mod models;

pub use locale::Locale;
