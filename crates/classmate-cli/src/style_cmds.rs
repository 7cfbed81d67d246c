//! `classmate style` commands: manage the local writing-style guide.

use anyhow::Result;

use classmate_core::style_guide::{self, StyleGuideStore};

use crate::StyleCommands;

pub fn run_style_command(command: StyleCommands, store: &StyleGuideStore) -> Result<()> {
    match command {
        StyleCommands::Set { samples } => {
            let guide = style_guide::load_samples(&samples)?;
            store.save(&guide)?;
            println!(
                "Style guide saved to {} ({} sample{}).",
                store.path().display(),
                samples.len(),
                if samples.len() == 1 { "" } else { "s" }
            );
        }
        StyleCommands::Show => match store.load()? {
            Some(guide) => println!("{guide}"),
            None => println!("No style guide saved."),
        },
        StyleCommands::Clear => {
            if store.clear()? {
                println!("Style guide cleared.");
            } else {
                println!("No style guide saved.");
            }
        }
    }
    Ok(())
}
