//! Core business logic

pub mod cache;
pub mod capture;
pub mod config;
pub mod controller;
pub mod convert;
pub mod currency;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod log;
pub mod rates;
pub mod scheduler;

// Re-export main types for cleaner imports
pub use capture::{FrameSource, OcrCapability};
pub use controller::{Command, Controller, ConversionView, Outcome};
pub use convert::DisplayUnit;
pub use currency::RateSource;
pub use error::ConverterError;
pub use rates::{RateStore, RateTable};
