use std::io::Write;

use anyhow::Result;
use clap::Parser;

use crate::tracker::{
    entities::{Axis, Effectiveness, EntryPatch, MentalStateSpectrum},
    storage::KeyValueStorage,
    store::EntryStore,
};

use super::output::{print_draft, print_entry, print_notice, print_spectrum};

#[derive(Debug, Parser)]
pub struct StateCommand {
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100), help = "0 = scattered, 100 = hyperfocused")]
    focus: Option<u8>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100), help = "0 = exhausted, 100 = hyperactive")]
    energy: Option<u8>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100), help = "0 = overwhelmed, 100 = calm")]
    mood: Option<u8>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100), help = "0 = disinterested, 100 = extremely curious")]
    curiosity: Option<u8>,
}

/// Updates axes of the mental state. The store replaces the whole spectrum, so unchanged axes are
/// taken from the draft, or from the neutral spectrum when the draft has none.
pub async fn process_state_command<S: KeyValueStorage>(
    store: &mut EntryStore<S>,
    StateCommand {
        focus,
        energy,
        mood,
        curiosity,
    }: StateCommand,
    out: &mut impl Write,
) -> Result<()> {
    let mut spectrum = store
        .current_entry()?
        .mental_state
        .unwrap_or(MentalStateSpectrum::NEUTRAL);
    for (axis, value) in [
        (Axis::Focus, focus),
        (Axis::Energy, energy),
        (Axis::Mood, mood),
        (Axis::Curiosity, curiosity),
    ] {
        if let Some(value) = value {
            spectrum = spectrum.with_axis(axis, value)?;
        }
    }

    store
        .update_current_entry(EntryPatch::default().mental_state(spectrum))
        .await?;
    print_spectrum(out, &spectrum)?;
    Ok(())
}

pub async fn process_activity_command<S: KeyValueStorage>(
    store: &mut EntryStore<S>,
    activity: String,
    out: &mut impl Write,
) -> Result<()> {
    store
        .update_current_entry(EntryPatch::default().activity(activity.trim()))
        .await?;
    writeln!(out, "Activity set.")?;
    Ok(())
}

pub async fn process_effectiveness_command<S: KeyValueStorage>(
    store: &mut EntryStore<S>,
    value: u8,
    out: &mut impl Write,
) -> Result<()> {
    let effectiveness = Effectiveness::new(value)?;
    store
        .update_current_entry(EntryPatch::default().effectiveness(effectiveness))
        .await?;
    writeln!(out, "Effectiveness set to {effectiveness}.")?;
    Ok(())
}

pub async fn process_notes_command<S: KeyValueStorage>(
    store: &mut EntryStore<S>,
    notes: String,
    out: &mut impl Write,
) -> Result<()> {
    store
        .update_current_entry(EntryPatch::default().notes(notes))
        .await?;
    writeln!(out, "Notes set.")?;
    Ok(())
}

pub fn process_show_command<S: KeyValueStorage>(
    store: &EntryStore<S>,
    out: &mut impl Write,
) -> Result<()> {
    print_draft(out, store.current_entry()?)?;
    Ok(())
}

/// Saves the draft as a new entry. A draft without any data is refused with a message instead.
pub async fn process_save_command<S: KeyValueStorage>(
    store: &mut EntryStore<S>,
    out: &mut impl Write,
) -> Result<bool> {
    let draft = store.current_entry()?.clone();
    if draft.is_empty() {
        print_notice(
            out,
            "nothing to save yet. Record your mental state, an activity, a test or some notes first.",
        )?;
        return Ok(false);
    }
    let entry = store.add_entry(draft).await?;
    writeln!(out, "Entry saved.")?;
    print_entry(out, &entry)?;
    Ok(true)
}

pub async fn process_reset_command<S: KeyValueStorage>(
    store: &mut EntryStore<S>,
    out: &mut impl Write,
) -> Result<()> {
    store.reset_current_entry().await?;
    writeln!(out, "Current entry discarded.")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use clap::Parser;
    use tempfile::tempdir;

    use crate::{
        cli::draft::{
            process_activity_command, process_effectiveness_command, process_notes_command,
            process_reset_command, process_save_command, process_state_command, StateCommand,
        },
        tracker::{create_file_store, entities::MentalStateSpectrum},
    };

    #[tokio::test]
    async fn test_state_keeps_other_axes() -> Result<()> {
        let dir = tempdir()?;
        let mut store = create_file_store(dir.path())?;
        store.rehydrate().await;
        let mut out = Vec::new();

        let command = StateCommand::try_parse_from(["state", "--focus", "80"])?;
        process_state_command(&mut store, command, &mut out).await?;
        let command = StateCommand::try_parse_from(["state", "--mood", "20"])?;
        process_state_command(&mut store, command, &mut out).await?;

        assert_eq!(
            store.current_entry()?.mental_state,
            Some(MentalStateSpectrum {
                focus: 80,
                energy: 50,
                mood: 20,
                curiosity: 50,
            })
        );
        Ok(())
    }

    #[test]
    fn test_state_rejects_out_of_range() {
        assert!(StateCommand::try_parse_from(["state", "--energy", "101"]).is_err());
        assert!(StateCommand::try_parse_from(["state", "--energy", "-1"]).is_err());
    }

    #[tokio::test]
    async fn test_save_flow() -> Result<()> {
        let dir = tempdir()?;
        let mut store = create_file_store(dir.path())?;
        store.rehydrate().await;
        let mut out = Vec::new();

        assert!(!process_save_command(&mut store, &mut out).await?);
        assert!(store.entries()?.is_empty());

        process_activity_command(&mut store, "  Reading ".into(), &mut out).await?;
        process_effectiveness_command(&mut store, 8, &mut out).await?;
        process_notes_command(&mut store, "calm".into(), &mut out).await?;
        assert!(process_effectiveness_command(&mut store, 11, &mut out)
            .await
            .is_err());

        assert!(process_save_command(&mut store, &mut out).await?);
        let entries = store.entries()?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].fields.activity.as_deref(), Some("Reading"));
        assert_eq!(entries[0].fields.effectiveness.map(|v| v.value()), Some(8));
        assert!(store.current_entry()?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_reset() -> Result<()> {
        let dir = tempdir()?;
        let mut store = create_file_store(dir.path())?;
        store.rehydrate().await;
        let mut out = Vec::new();

        process_notes_command(&mut store, "scratch".into(), &mut out).await?;
        process_reset_command(&mut store, &mut out).await?;
        assert!(store.current_entry()?.is_empty());
        Ok(())
    }
}
