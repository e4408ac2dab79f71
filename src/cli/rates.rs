use super::ui;
use crate::core::convert::{DisplayUnit, convert, format_fiat, format_sats};
use crate::core::{Command, Controller, Outcome, RateTable};
use anyhow::{Result, bail};

/// Table of every currency in selector order.
pub fn display_rates(table: &RateTable, dark_mode: bool) -> String {
    let mut out = ui::new_styled_table();
    out.set_header(vec![
        ui::header_cell("Currency", dark_mode),
        ui::header_cell("1 BTC", dark_mode),
        ui::header_cell("1 unit in sats", dark_mode),
    ]);

    for code in table.ordered_codes() {
        let Some(price) = table.get(&code) else {
            continue;
        };
        out.add_row(vec![
            comfy_table::Cell::new(&code),
            ui::value_cell(&format_fiat(price, &code)),
            ui::value_cell(&format_sats(convert(1.0, price, DisplayUnit::Sats))),
        ]);
    }
    out.to_string()
}

pub async fn run(controller: &mut Controller) -> Result<()> {
    let spinner = ui::new_spinner("Fetching rates...");
    let outcome = controller.dispatch(Command::RequestRefresh).await;
    spinner.finish_and_clear();

    if let Outcome::Failed(e) = outcome {
        bail!(e);
    }
    let Some(table) = controller.rate_table().await else {
        bail!("No rates available");
    };

    let view = controller.view().await;
    println!(
        "{}\n",
        ui::style_text("Bitcoin exchange rates", ui::StyleType::Title)
    );
    println!("{}", display_rates(&table, view.dark_mode));
    if let Some(updated) = view.updated {
        println!("{}", ui::style_text(&updated, ui::StyleType::Subtle));
    }
    Ok(())
}
