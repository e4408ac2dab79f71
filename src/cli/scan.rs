use super::ui;
use crate::core::convert::format_fiat;
use crate::core::error::ConverterError;
use crate::core::extract::{ScoringWeights, extract_price};
use crate::core::{Command, Controller, Outcome};
use anyhow::{Result, bail};
use tracing::{info, warn};

/// Reads a price from the camera frame and prints its conversion.
pub async fn run(controller: &mut Controller) -> Result<f64> {
    let spinner = ui::new_spinner("Fetching rates...");
    if let Outcome::Failed(e) = controller.dispatch(Command::RequestRefresh).await {
        warn!(error = %e, "Scanning without fresh rates");
    }
    spinner.finish_and_clear();

    if let Outcome::Failed(e) = controller.dispatch(Command::OpenScanner).await {
        bail!(e);
    }

    let spinner = ui::new_spinner("Scanning…");
    let outcome = controller.dispatch(Command::Capture).await;
    spinner.finish_and_clear();

    let price = match outcome {
        Outcome::PriceCaptured(price) => price,
        Outcome::Failed(e) => bail!(e),
        other => bail!("Unexpected scanner outcome: {other:?}"),
    };
    info!(price, "Captured price");

    let view = controller.view().await;
    println!(
        "Detected price: {}\n",
        ui::style_text(&format_fiat(price, &view.currency), ui::StyleType::Value)
    );
    println!("{}", view.display_as_table());
    Ok(price)
}

/// Runs the price extractor on text, without a camera or OCR.
pub fn run_extract(text: &str, weights: &ScoringWeights) -> Result<f64> {
    let Some(price) = extract_price(text, weights) else {
        bail!(ConverterError::NoPriceCandidateFound);
    };
    println!("{}", ui::style_text(&price.to_string(), ui::StyleType::Value));
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RateStore;
    use crate::core::capture::tests::{FakeCamera, FakeOcr};
    use crate::core::config::AppConfig;
    use crate::core::fetcher::RateFetcher;
    use crate::providers::test_mode::TestModeSource;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    fn controller(camera: Arc<FakeCamera>, ocr: FakeOcr) -> Controller {
        let config = AppConfig {
            test_mode: true,
            auto_refresh: false,
            ..AppConfig::default()
        };
        let fetcher = Arc::new(RateFetcher::new(
            Arc::new(TestModeSource),
            Arc::new(TestModeSource),
            Arc::new(RateStore::new()),
        ));
        Controller::new(&config, fetcher, camera, Arc::new(ocr))
    }

    #[tokio::test]
    async fn test_scan_converts_captured_price() {
        let camera = Arc::new(FakeCamera::new());
        let mut controller = controller(Arc::clone(&camera), FakeOcr::text("QTY 2\n$ 34.00"));

        let price = run(&mut controller).await.unwrap();

        assert_eq!(price, 34.0);
        assert_eq!(controller.view().await.converted, "0.0005 BTC");
        assert!(!camera.live.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_scan_without_price_fails_and_releases_camera() {
        let camera = Arc::new(FakeCamera::new());
        let mut controller = controller(Arc::clone(&camera), FakeOcr::text("no digits"));

        let err = run(&mut controller).await.unwrap_err();

        assert_eq!(
            err.downcast_ref::<ConverterError>(),
            Some(&ConverterError::NoPriceCandidateFound)
        );
        assert!(!camera.live.load(Ordering::SeqCst));
        assert!(!controller.is_scanner_open());
    }

    #[tokio::test]
    async fn test_scan_permission_denied() {
        let camera = Arc::new(FakeCamera {
            deny: true,
            ..FakeCamera::new()
        });
        let mut controller = controller(camera, FakeOcr::text("$1"));

        let err = run(&mut controller).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConverterError>(),
            Some(&ConverterError::CameraPermissionDenied)
        );
    }

    #[test]
    fn test_run_extract() {
        let weights = ScoringWeights::default();
        assert_eq!(run_extract("Total €12,50", &weights).unwrap(), 12.5);
        assert!(run_extract("", &weights).is_err());
    }
}
