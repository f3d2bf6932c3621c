use anyhow::{bail, Context, Result};
use chrono::Utc;

use srs_cards::flashcards::storage::load_snapshot;
use srs_cards::flashcards::select_due;
use srs_cards::ServerConfig;

use crate::OutputFormat;

pub fn run(config: &ServerConfig, format: &OutputFormat) -> Result<()> {
    let Some(path) = &config.data_file else {
        bail!("No data file configured; pass --data-file or set data_file in the config");
    };

    let cards = if path.exists() {
        load_snapshot(path).with_context(|| format!("Failed to read {:?}", path))?
    } else {
        Vec::new()
    };
    let due = select_due(&cards, Utc::now());

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&due)?);
        }
        OutputFormat::Plain => {
            if due.is_empty() {
                println!("No cards due ({} total).", cards.len());
                return Ok(());
            }

            let front_width = due.iter().map(|c| c.front.len()).max().unwrap_or(5).clamp(5, 40);

            println!("{:<fw$} {:>8} {}", "Front", "Interval", "Due since", fw = front_width);
            for card in &due {
                let front: String = card.front.chars().take(front_width).collect();
                println!(
                    "{:<fw$} {:>7}d {}",
                    front,
                    card.interval_days,
                    card.next_due_at.format("%Y-%m-%d %H:%M UTC"),
                    fw = front_width
                );
            }
            println!("\n{} of {} cards due", due.len(), cards.len());
        }
    }

    Ok(())
}
