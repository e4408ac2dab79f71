use super::ui;
use crate::core::{Command, Controller, Outcome};
use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, interval_at};
use tracing::{info, warn};

/// Gives the background refresh a head start before each redraw.
const RENDER_LAG: Duration = Duration::from_secs(1);

/// Prints the conversion of `amount` and redraws it every `period` until Ctrl-C.
pub async fn run(controller: &mut Controller, amount: &str, period: Duration) -> Result<()> {
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    let renders = watch_until(controller, amount, period, shutdown).await?;
    info!(renders, "Stopped watching");
    Ok(())
}

/// Drives the watch loop until `shutdown` resolves; returns the number of redraws.
pub async fn watch_until<S>(
    controller: &mut Controller,
    amount: &str,
    period: Duration,
    shutdown: S,
) -> Result<usize>
where
    S: Future<Output = ()>,
{
    let spinner = ui::new_spinner("Fetching rates...");
    let outcome = controller.boot().await;
    spinner.finish_and_clear();
    if let Outcome::Failed(e) = outcome {
        // Keep watching; the schedule retries on the next tick.
        warn!(error = %e, "Initial rate fetch failed");
    }

    controller
        .dispatch(Command::ChangeAmount(amount.to_string()))
        .await;
    println!("{}", controller.view().await.display_as_table());
    let mut renders = 1;

    let mut ticker = interval_at(Instant::now() + period + RENDER_LAG, period);
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                ui::print_separator();
                println!("{}", controller.view().await.display_as_table());
                renders += 1;
            }
        }
    }

    controller.dispatch(Command::VisibilityChanged(false)).await;
    Ok(renders)
}
