pub mod cli;
pub mod core;
pub mod providers;

use crate::core::capture::FrameSource;
use crate::core::config::AppConfig;
use crate::core::fetcher::RateFetcher;
use crate::core::{Controller, DisplayUnit, RateStore};
use crate::providers::coinbase::CoinbaseRateSource;
use crate::providers::still_image::{NoCamera, StillImageSource};
use crate::providers::tesseract::TesseractOcr;
use crate::providers::test_mode::TestModeSource;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Per-invocation overrides of the configured defaults.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub currency: Option<String>,
    pub unit: Option<DisplayUnit>,
    pub test_mode: bool,
}

impl ConvertOptions {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(currency) = &self.currency {
            config.currency = currency.to_uppercase();
        }
        if let Some(unit) = self.unit {
            config.unit = unit;
        }
        config.test_mode |= self.test_mode;
    }
}

#[derive(Debug, Clone)]
pub enum AppCommand {
    Convert {
        amount: String,
        options: ConvertOptions,
    },
    Rates {
        options: ConvertOptions,
    },
    Watch {
        amount: String,
        options: ConvertOptions,
    },
    Scan {
        image: PathBuf,
        options: ConvertOptions,
    },
    Extract {
        text: String,
    },
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

/// Wires the live and test rate sources, OCR and `frames` into a controller.
pub fn build_controller(config: &AppConfig, frames: Arc<dyn FrameSource>) -> Result<Controller> {
    let live = Arc::new(CoinbaseRateSource::new(config.coinbase_base_url())?);
    let fetcher = Arc::new(RateFetcher::new(
        live,
        Arc::new(TestModeSource),
        Arc::new(RateStore::new()),
    ));
    let ocr = Arc::new(TesseractOcr::new(
        &config.scanner.ocr_command,
        &config.scanner.language,
    ));
    Ok(Controller::new(config, fetcher, frames, ocr))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("satsconv starting...");
    let mut config = load_config(config_path)?;

    match command {
        AppCommand::Convert { amount, options } => {
            options.apply(&mut config);
            config.auto_refresh = false;
            let mut controller = build_controller(&config, Arc::new(NoCamera))?;
            cli::convert::run(&mut controller, &amount).await
        }
        AppCommand::Rates { options } => {
            options.apply(&mut config);
            config.auto_refresh = false;
            let mut controller = build_controller(&config, Arc::new(NoCamera))?;
            cli::rates::run(&mut controller).await
        }
        AppCommand::Watch { amount, options } => {
            options.apply(&mut config);
            config.auto_refresh = true;
            let mut controller = build_controller(&config, Arc::new(NoCamera))?;
            cli::watch::run(&mut controller, &amount, config.refresh_interval()).await
        }
        AppCommand::Scan { image, options } => {
            options.apply(&mut config);
            config.auto_refresh = false;
            let frames = Arc::new(StillImageSource::new(&image));
            let mut controller = build_controller(&config, frames)?;
            cli::scan::run(&mut controller).await.map(|_| ())
        }
        AppCommand::Extract { text } => cli::scan::run_extract(&text, &config.scoring).map(|_| ()),
    }
}
