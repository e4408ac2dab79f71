use super::ui;
use crate::core::{Command, Controller, ConversionView, Outcome};
use anyhow::{Result, bail};
use tracing::warn;

impl ConversionView {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell(&format!("Amount ({})", self.currency), self.dark_mode),
            ui::header_cell(&format!("Value ({})", self.unit), self.dark_mode),
            ui::header_cell("1 BTC", self.dark_mode),
        ]);
        table.add_row(vec![
            ui::value_cell(&self.fiat),
            ui::value_cell(&self.converted),
            ui::value_cell(&self.one_btc),
        ]);

        let mut output = table.to_string();

        if !self.using_rate.is_empty() {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(&self.using_rate, ui::StyleType::Subtle)
            ));
        }
        if let Some(updated) = &self.updated {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(updated, ui::StyleType::Subtle)
            ));
        }
        if let Some(error) = &self.error {
            output.push_str(&format!(
                "\n{} {}",
                ui::style_text("Couldn't refresh rates:", ui::StyleType::Error),
                error
            ));
        }

        output
    }
}

/// Fetches rates once and prints the conversion of `amount`.
pub async fn run(controller: &mut Controller, amount: &str) -> Result<()> {
    let spinner = ui::new_spinner("Fetching rates...");
    let outcome = controller.dispatch(Command::RequestRefresh).await;
    spinner.finish_and_clear();

    controller
        .dispatch(Command::ChangeAmount(amount.to_string()))
        .await;
    let view = controller.view().await;

    if let Outcome::Failed(e) = outcome {
        warn!(error = %e, "Conversion without fresh rates");
        if view.updated.is_none() {
            bail!(e);
        }
    }

    println!("{}", view.display_as_table());
    Ok(())
}
