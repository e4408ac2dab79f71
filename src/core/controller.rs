//! Session controller: owns the conversion state and applies user intents.
//!
//! Every user action is a [`Command`]; [`Controller::dispatch`] is the only
//! way state changes. Rendering reads a [`ConversionView`] snapshot.

use super::capture::{CaptureConfig, FrameSource, OcrCapability, ScannerSession};
use super::config::AppConfig;
use super::convert::{DisplayUnit, describe, price_for_currency};
use super::error::ConverterError;
use super::fetcher::RateFetcher;
use super::rates::RateTable;
use super::scheduler::RefreshScheduler;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Discrete user intents.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ChangeAmount(String),
    ChangeCurrency(String),
    SetUnit(DisplayUnit),
    ToggleAutoRefresh(bool),
    ToggleDarkMode(bool),
    ToggleTestMode(bool),
    RequestRefresh,
    OpenScanner,
    CloseScanner,
    Capture,
    VisibilityChanged(bool),
}

/// Result of a dispatched command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Updated,
    Refreshed,
    ScannerOpened,
    ScannerClosed,
    PriceCaptured(f64),
    /// Recoverable failure to show to the user.
    Failed(ConverterError),
}

#[derive(Debug, Clone)]
pub struct ConversionState {
    pub currency: String,
    pub unit: DisplayUnit,
    /// Raw amount as typed; may be NaN.
    pub amount: f64,
    pub auto_refresh: bool,
    pub test_mode: bool,
    pub dark_mode: bool,
}

impl ConversionState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            currency: config.currency.to_uppercase(),
            unit: config.unit,
            amount: 0.0,
            auto_refresh: config.auto_refresh,
            test_mode: config.test_mode,
            dark_mode: config.dark_mode,
        }
    }
}

/// Empty input counts as zero; anything unparsable is NaN.
pub fn parse_amount(input: &str) -> f64 {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

/// Everything needed to render the converter.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionView {
    pub currency: String,
    pub unit: DisplayUnit,
    pub one_btc: String,
    pub fiat: String,
    pub converted: String,
    pub using_rate: String,
    pub updated: Option<String>,
    pub error: Option<String>,
    pub currency_options: Vec<String>,
    pub auto_refresh: bool,
    pub dark_mode: bool,
    pub scanner_open: bool,
}

pub struct Controller {
    state: ConversionState,
    fetcher: Arc<RateFetcher>,
    scheduler: RefreshScheduler,
    frames: Arc<dyn FrameSource>,
    ocr: Arc<dyn OcrCapability>,
    capture: CaptureConfig,
    scanner: Option<ScannerSession>,
    visible: bool,
}

impl Controller {
    pub fn new(
        config: &AppConfig,
        fetcher: Arc<RateFetcher>,
        frames: Arc<dyn FrameSource>,
        ocr: Arc<dyn OcrCapability>,
    ) -> Self {
        let state = ConversionState::from_config(config);
        fetcher.set_test_mode(state.test_mode);
        Self {
            state,
            fetcher,
            scheduler: RefreshScheduler::new(config.refresh_interval()),
            frames,
            ocr,
            capture: config.capture_config(),
            scanner: None,
            visible: true,
        }
    }

    pub fn state(&self) -> &ConversionState {
        &self.state
    }

    pub fn is_refresh_scheduled(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn is_scanner_open(&self) -> bool {
        self.scanner.is_some()
    }

    pub async fn rate_table(&self) -> Option<Arc<RateTable>> {
        self.fetcher.store().table().await
    }

    /// Initial fetch, then the auto-refresh schedule if enabled.
    pub async fn boot(&mut self) -> Outcome {
        let outcome = self.refresh().await;
        self.apply_schedule();
        outcome
    }

    pub async fn dispatch(&mut self, command: Command) -> Outcome {
        debug!(?command, "Dispatching");
        match command {
            Command::ChangeAmount(input) => {
                self.state.amount = parse_amount(&input);
                Outcome::Updated
            }
            Command::ChangeCurrency(code) => {
                self.state.currency = code.trim().to_uppercase();
                Outcome::Updated
            }
            Command::SetUnit(unit) => {
                self.state.unit = unit;
                Outcome::Updated
            }
            Command::ToggleAutoRefresh(on) => {
                self.state.auto_refresh = on;
                self.apply_schedule();
                Outcome::Updated
            }
            Command::ToggleDarkMode(on) => {
                self.state.dark_mode = on;
                Outcome::Updated
            }
            Command::ToggleTestMode(on) => {
                self.state.test_mode = on;
                self.fetcher.set_test_mode(on);
                self.refresh().await
            }
            Command::RequestRefresh => self.refresh().await,
            Command::OpenScanner => self.open_scanner().await,
            Command::CloseScanner => {
                self.close_scanner();
                Outcome::ScannerClosed
            }
            Command::Capture => self.capture().await,
            Command::VisibilityChanged(visible) => {
                self.visible = visible;
                if !visible {
                    self.close_scanner();
                }
                self.apply_schedule();
                Outcome::Updated
            }
        }
    }

    pub async fn view(&self) -> ConversionView {
        let store = self.fetcher.store();
        let snapshot = store.snapshot().await;
        let table = snapshot.as_ref().map(|s| s.table.as_ref());

        let price = table.and_then(|t| price_for_currency(t, &self.state.currency));
        let conversion = describe(self.state.amount, &self.state.currency, price, self.state.unit);

        let updated = snapshot.as_ref().map(|s| {
            let suffix = if s.test_mode { " (Test Mode)" } else { "" };
            format!(
                "Last updated: {}{suffix}",
                s.fetched_at.format("%Y-%m-%d %H:%M:%S")
            )
        });

        ConversionView {
            currency: self.state.currency.clone(),
            unit: self.state.unit,
            one_btc: conversion.one_btc,
            fiat: conversion.fiat,
            converted: conversion.converted,
            using_rate: conversion.using_rate,
            updated,
            error: store.last_error().await.map(|e| e.to_string()),
            currency_options: store.currency_options().await,
            auto_refresh: self.state.auto_refresh,
            dark_mode: self.state.dark_mode,
            scanner_open: self.scanner.is_some(),
        }
    }

    async fn refresh(&mut self) -> Outcome {
        match self.fetcher.refresh().await {
            Ok(_) => Outcome::Refreshed,
            Err(e) => Outcome::Failed(e),
        }
    }

    /// Runs the schedule only while auto-refresh is on and the app is visible.
    fn apply_schedule(&mut self) {
        self.scheduler.stop();
        if self.state.auto_refresh && self.visible {
            let fetcher = Arc::clone(&self.fetcher);
            self.scheduler.start(move || {
                let fetcher = Arc::clone(&fetcher);
                async move {
                    // Errors are recorded in the store for the banner.
                    let _ = fetcher.refresh().await;
                }
            });
        }
    }

    async fn open_scanner(&mut self) -> Outcome {
        if self.scanner.is_some() {
            return Outcome::ScannerOpened;
        }

        // Warm the OCR engine while the camera starts.
        let ocr = Arc::clone(&self.ocr);
        tokio::spawn(async move {
            if let Err(e) = ocr.ensure_ready().await {
                debug!(error = %e, "OCR warm-up failed");
            }
        });

        match ScannerSession::open(self.frames.as_ref()).await {
            Ok(session) => {
                self.scanner = Some(session);
                Outcome::ScannerOpened
            }
            Err(e) => {
                warn!(error = %e, "Camera access failed");
                Outcome::Failed(e)
            }
        }
    }

    fn close_scanner(&mut self) {
        if let Some(session) = self.scanner.take() {
            session.close();
            info!("Scanner closed");
        }
    }

    async fn capture(&mut self) -> Outcome {
        let Some(session) = self.scanner.as_mut() else {
            return Outcome::Failed(ConverterError::CameraUnavailable(
                "scanner is not open".into(),
            ));
        };

        let result = session.capture(self.ocr.as_ref(), &self.capture).await;
        self.close_scanner();

        match result {
            Ok(price) => {
                self.state.amount = price;
                Outcome::PriceCaptured(price)
            }
            Err(e) => {
                warn!(error = %e, "Capture failed");
                Outcome::Failed(e)
            }
        }
    }
}
