//! Presentation of drafts, entries and test results in a terminal.

use std::io::{self, Write};

use ansi_term::{Colour, Style};

use crate::{
    tracker::{
        entities::{Axis, Entry, EntryDraft, MentalStateSpectrum, TimePerception},
        evaluator::PerceptionRating,
        session::{DrawingCapture, TestOutcome},
    },
    utils::{
        percentage::Percentage,
        time::{display_seconds, display_timestamp},
    },
};

const BAR_WIDTH: usize = 20;

fn axis_colour(axis: Axis) -> Colour {
    match axis {
        Axis::Focus => Colour::Blue,
        Axis::Energy => Colour::Green,
        Axis::Mood => Colour::Purple,
        Axis::Curiosity => Colour::Yellow,
    }
}

fn accuracy_colour(accuracy: Percentage) -> Colour {
    match PerceptionRating::from_accuracy(accuracy) {
        PerceptionRating::Excellent => Colour::Green,
        PerceptionRating::Good => Colour::Blue,
        PerceptionRating::Off => Colour::Yellow,
    }
}

/// Horizontal bar for a value between 0 and 100.
fn bar(value: f64, colour: Colour) -> String {
    let filled = ((value.clamp(0., 100.) / 100.) * BAR_WIDTH as f64).round() as usize;
    format!(
        "{}{}",
        colour.paint("█".repeat(filled)),
        "░".repeat(BAR_WIDTH - filled)
    )
}

pub fn print_notice(out: &mut impl Write, message: impl std::fmt::Display) -> io::Result<()> {
    writeln!(out, "{} {message}", Colour::Yellow.bold().paint("Notice:"))
}

pub fn print_spectrum(out: &mut impl Write, spectrum: &MentalStateSpectrum) -> io::Result<()> {
    for axis in Axis::ALL {
        let (low, high) = axis.extremes();
        let value = spectrum.get(axis);
        writeln!(
            out,
            "  {:<10} {} {value:>3}  ({low} … {high})",
            axis.label(),
            bar(value as f64, axis_colour(axis)),
        )?;
    }
    Ok(())
}

fn print_time_perception(out: &mut impl Write, perception: &TimePerception) -> io::Result<()> {
    writeln!(
        out,
        "  {}: target {}, yours {}, accuracy {}",
        perception.test_type.title(),
        display_seconds(perception.perceived),
        display_seconds(perception.actual),
        accuracy_colour(perception.accuracy).paint(perception.accuracy.to_string()),
    )?;
    writeln!(
        out,
        "  {}",
        bar(*perception.accuracy, accuracy_colour(perception.accuracy))
    )
}

/// Prints every present field of an entry body. Absent ones are skipped entirely.
fn print_fields(out: &mut impl Write, fields: &EntryDraft) -> io::Result<()> {
    let label = Style::new().bold();
    if let Some(activity) = &fields.activity {
        writeln!(out, "{} {activity}", label.paint("Activity:"))?;
    }
    if let Some(effectiveness) = fields.effectiveness {
        writeln!(out, "{} {effectiveness}", label.paint("Effectiveness:"))?;
    }
    if let Some(spectrum) = &fields.mental_state {
        writeln!(out, "{}", label.paint("Mental state:"))?;
        print_spectrum(out, spectrum)?;
    }
    if let Some(perception) = &fields.time_perception {
        writeln!(out, "{}", label.paint("Time perception:"))?;
        print_time_perception(out, perception)?;
    }
    if let Some(notes) = &fields.notes {
        writeln!(out, "{} {notes}", label.paint("Notes:"))?;
    }
    if fields.drawing.is_some() {
        writeln!(out, "{} attached", label.paint("Drawing:"))?;
    }
    Ok(())
}

pub fn print_draft(out: &mut impl Write, draft: &EntryDraft) -> io::Result<()> {
    if draft.is_empty() {
        return writeln!(out, "Current entry is empty.");
    }
    writeln!(out, "{}", Style::new().underline().paint("Current entry"))?;
    print_fields(out, draft)
}

pub fn print_entry(out: &mut impl Write, entry: &Entry) -> io::Result<()> {
    writeln!(
        out,
        "{}",
        Style::new()
            .underline()
            .paint(display_timestamp(entry.timestamp))
    )?;
    if entry.fields.is_empty() {
        writeln!(out, "(nothing recorded)")?;
    }
    print_fields(out, &entry.fields)
}

pub fn print_test_result(out: &mut impl Write, outcome: &TestOutcome) -> io::Result<()> {
    let perception = &outcome.perception;
    writeln!(out, "{}", Style::new().bold().paint("Results"))?;
    writeln!(out, "  Target time: {}", display_seconds(perception.perceived))?;
    writeln!(out, "  Your time:   {}", display_seconds(perception.actual))?;
    writeln!(
        out,
        "  Difference:  {}",
        display_seconds(outcome.evaluation.difference_seconds)
    )?;
    let colour = accuracy_colour(perception.accuracy);
    writeln!(
        out,
        "  Accuracy:    {}",
        colour.paint(perception.accuracy.to_string())
    )?;
    writeln!(
        out,
        "{}",
        colour.paint(PerceptionRating::from_accuracy(perception.accuracy).message())
    )?;
    match &outcome.drawing {
        DrawingCapture::Captured(_) => writeln!(out, "Drawing saved to the current entry.")?,
        DrawingCapture::Failed(reason) => {
            print_notice(out, format!("drawing couldn't be captured: {reason}"))?
        }
        DrawingCapture::NotApplicable | DrawingCapture::Empty => {}
    }
    Ok(())
}
