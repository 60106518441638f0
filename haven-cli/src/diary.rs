use chrono::Local;
use haven_core::{DiaryEntry, DiaryStore};
use haven_gateway::{IllustrationOutcome, Services, save_entry};

use crate::CliError;

/// Summarize `text` into a new diary entry and save it.
pub async fn write(
    services: &Services,
    store: &dyn DiaryStore,
    text: &str,
) -> Result<(), CliError> {
    let synthesis = services.diaries.synthesize(text).await?;

    println!("{}", synthesis.entry.summary());
    match synthesis.illustration {
        IllustrationOutcome::Generated => println!("(illustration attached)"),
        IllustrationOutcome::Failed(_) => {
            println!("(the illustration couldn't be drawn this time)")
        }
        IllustrationOutcome::Declined | IllustrationOutcome::Skipped => {}
    }

    let entries = save_entry(store, synthesis.entry)?;
    println!("Saved. {} entries in your diary.", entries.len());
    Ok(())
}

/// Print stored entries, newest first.
pub fn list(store: &dyn DiaryStore, limit: Option<usize>) -> Result<(), CliError> {
    let entries = store.load()?;
    if entries.is_empty() {
        println!("Your diary is empty.");
        return Ok(());
    }

    for entry in entries.iter().take(limit.unwrap_or(usize::MAX)) {
        println!("{}", render(entry));
    }
    Ok(())
}

fn render(entry: &DiaryEntry) -> String {
    let local = entry.timestamp().with_timezone(&Local);
    let when = local.format("%Y-%m-%d %H:%M");
    let mut out = format!("── {when} ──\n{}\n", entry.summary());
    if !entry.images().is_empty() {
        out.push_str(&format!("[{} image(s)]\n", entry.images().len()));
    }
    out
}
