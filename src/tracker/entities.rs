use std::fmt::Display;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::utils::percentage::Percentage;

/// Maximum value of any mental state axis.
pub const AXIS_MAX: u8 = 100;

/// Self rated mental state. Every axis is independent and lies within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SpectrumRepr")]
pub struct MentalStateSpectrum {
    /// 0 = scattered, 100 = hyperfocused
    pub focus: u8,
    /// 0 = exhausted, 100 = hyperactive
    pub energy: u8,
    /// 0 = overwhelmed, 100 = calm
    pub mood: u8,
    /// 0 = disinterested, 100 = extremely curious
    pub curiosity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Focus,
    Energy,
    Mood,
    Curiosity,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::Focus, Axis::Energy, Axis::Mood, Axis::Curiosity];

    pub fn label(self) -> &'static str {
        match self {
            Axis::Focus => "Focus",
            Axis::Energy => "Energy",
            Axis::Mood => "Mood",
            Axis::Curiosity => "Curiosity",
        }
    }

    /// Descriptions of both ends of the axis.
    pub fn extremes(self) -> (&'static str, &'static str) {
        match self {
            Axis::Focus => ("Scattered", "Hyperfocused"),
            Axis::Energy => ("Exhausted", "Hyperactive"),
            Axis::Mood => ("Overwhelmed", "Calm"),
            Axis::Curiosity => ("Disinterested", "Extremely Curious"),
        }
    }
}

impl MentalStateSpectrum {
    /// Value shown before the user touches anything. It's never persisted on its own.
    pub const NEUTRAL: MentalStateSpectrum = MentalStateSpectrum {
        focus: 50,
        energy: 50,
        mood: 50,
        curiosity: 50,
    };

    pub fn get(&self, axis: Axis) -> u8 {
        match axis {
            Axis::Focus => self.focus,
            Axis::Energy => self.energy,
            Axis::Mood => self.mood,
            Axis::Curiosity => self.curiosity,
        }
    }

    /// Returns a complete copy of the spectrum with a single axis replaced.
    pub fn with_axis(self, axis: Axis, value: u8) -> Result<Self> {
        if value > AXIS_MAX {
            return Err(anyhow!(
                "{} must be between 0 and {AXIS_MAX}, got {value}",
                axis.label()
            ));
        }
        let mut state = self;
        match axis {
            Axis::Focus => state.focus = value,
            Axis::Energy => state.energy = value,
            Axis::Mood => state.mood = value,
            Axis::Curiosity => state.curiosity = value,
        }
        Ok(state)
    }
}

#[derive(Deserialize)]
struct SpectrumRepr {
    focus: u8,
    energy: u8,
    mood: u8,
    curiosity: u8,
}

impl TryFrom<SpectrumRepr> for MentalStateSpectrum {
    type Error = anyhow::Error;

    fn try_from(v: SpectrumRepr) -> Result<Self, Self::Error> {
        MentalStateSpectrum::NEUTRAL
            .with_axis(Axis::Focus, v.focus)?
            .with_axis(Axis::Energy, v.energy)?
            .with_axis(Axis::Mood, v.mood)?
            .with_axis(Axis::Curiosity, v.curiosity)
    }
}

/// How effective the user feels at the current activity, from 1 to 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Effectiveness(u8);

impl Effectiveness {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(value: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(anyhow!(
                "Effectiveness must be between {} and {}, got {value}",
                Self::MIN,
                Self::MAX
            ))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Effectiveness {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Effectiveness::new(value)
    }
}

impl From<Effectiveness> for u8 {
    fn from(value: Effectiveness) -> Self {
        value.0
    }
}

impl Display for Effectiveness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}

/// Themes offered for the drawing test.
pub const DRAWING_PROMPTS: [&str; 5] = [
    "Draw how your mind feels right now",
    "Sketch your current thought pattern",
    "Draw your energy flow",
    "Illustrate your focus level",
    "Draw your mental landscape",
];

/// Kinds of time perception exercises. The order of [TestType::ALL] is the order tests are
/// offered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    Drawing,
    Counting,
    Meditation,
    Tapping,
}

impl TestType {
    pub const ALL: [TestType; 4] = [
        TestType::Drawing,
        TestType::Counting,
        TestType::Meditation,
        TestType::Tapping,
    ];

    /// Duration the user is trying to estimate.
    pub fn target_seconds(self) -> f64 {
        match self {
            TestType::Drawing => 30.,
            TestType::Counting => 20.,
            TestType::Meditation => 45.,
            TestType::Tapping => 15.,
        }
    }

    /// Next test in cyclic order.
    pub fn next(self) -> TestType {
        let index = Self::ALL.iter().position(|v| *v == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn title(self) -> &'static str {
        match self {
            TestType::Drawing => "Drawing Test",
            TestType::Counting => "Counting Test",
            TestType::Meditation => "Meditation Test",
            TestType::Tapping => "Rhythm Test",
        }
    }

    /// A random theme for tests that have one.
    pub fn prompt(self) -> Option<&'static str> {
        match self {
            TestType::Drawing => DRAWING_PROMPTS.choose(&mut rand::thread_rng()).copied(),
            TestType::Counting | TestType::Meditation | TestType::Tapping => None,
        }
    }

    pub fn instructions(self) -> &'static str {
        match self {
            TestType::Drawing => "Draw freely until you think 30 seconds have passed",
            TestType::Counting => {
                "Close your eyes and count numbers in your head until you think 20 seconds have passed"
            }
            TestType::Meditation => {
                "Close your eyes and sit still until you think 45 seconds have passed"
            }
            TestType::Tapping => {
                "Tap at a steady pace until you think 15 seconds have passed"
            }
        }
    }
}

impl Display for TestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestType::Drawing => write!(f, "drawing"),
            TestType::Counting => write!(f, "counting"),
            TestType::Meditation => write!(f, "meditation"),
            TestType::Tapping => write!(f, "tapping"),
        }
    }
}

/// Result of a completed time perception test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePerception {
    /// Measured seconds between start and stop.
    pub actual: f64,
    /// Seconds the user was trying to feel, i.e. the target of the test.
    pub perceived: f64,
    pub test_type: TestType,
    pub accuracy: Percentage,
}

/// All the optional dimensions of an entry. Used both as the in-progress draft and as the body
/// of a saved [Entry]. Absent fields are omitted from json instead of being written as null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mental_state: Option<MentalStateSpectrum>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effectiveness: Option<Effectiveness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Opaque serialized strokes of the drawing test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_perception: Option<TimePerception>,
}

impl EntryDraft {
    /// Applies a patch using shallow semantics: every field named by the patch is replaced as a
    /// whole, nested values included. Fields the patch keeps are left untouched.
    pub fn merge(&mut self, patch: EntryPatch) {
        let EntryPatch {
            mental_state,
            activity,
            effectiveness,
            notes,
            drawing,
            time_perception,
        } = patch;
        mental_state.apply(&mut self.mental_state);
        activity.apply(&mut self.activity);
        effectiveness.apply(&mut self.effectiveness);
        notes.apply(&mut self.notes);
        drawing.apply(&mut self.drawing);
        time_perception.apply(&mut self.time_perception);
    }

    /// True when there is nothing worth saving. Blank strings count as nothing.
    pub fn is_empty(&self) -> bool {
        fn blank(v: &Option<String>) -> bool {
            v.as_deref().map_or(true, |v| v.trim().is_empty())
        }

        self.mental_state.is_none()
            && blank(&self.activity)
            && self.effectiveness.is_none()
            && blank(&self.notes)
            && blank(&self.drawing)
            && self.time_perception.is_none()
    }
}

/// A single finalized record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: EntryDraft,
}

/// Change of a single draft field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate<T> {
    Keep,
    Set(T),
    Clear,
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        FieldUpdate::Keep
    }
}

impl<T> FieldUpdate<T> {
    fn apply(self, target: &mut Option<T>) {
        match self {
            FieldUpdate::Keep => {}
            FieldUpdate::Set(v) => *target = Some(v),
            FieldUpdate::Clear => *target = None,
        }
    }
}

impl<T> From<Option<T>> for FieldUpdate<T> {
    /// `None` clears the field.
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => FieldUpdate::Set(v),
            None => FieldUpdate::Clear,
        }
    }
}

/// Partial update of the draft. Fields default to [FieldUpdate::Keep].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    pub mental_state: FieldUpdate<MentalStateSpectrum>,
    pub activity: FieldUpdate<String>,
    pub effectiveness: FieldUpdate<Effectiveness>,
    pub notes: FieldUpdate<String>,
    pub drawing: FieldUpdate<String>,
    pub time_perception: FieldUpdate<TimePerception>,
}

impl EntryPatch {
    pub fn mental_state(mut self, v: MentalStateSpectrum) -> Self {
        self.mental_state = FieldUpdate::Set(v);
        self
    }

    pub fn activity(mut self, v: impl Into<String>) -> Self {
        self.activity = FieldUpdate::Set(v.into());
        self
    }

    pub fn effectiveness(mut self, v: Effectiveness) -> Self {
        self.effectiveness = FieldUpdate::Set(v);
        self
    }

    pub fn notes(mut self, v: impl Into<String>) -> Self {
        self.notes = FieldUpdate::Set(v.into());
        self
    }

    pub fn drawing(mut self, v: Option<String>) -> Self {
        self.drawing = v.into();
        self
    }

    pub fn time_perception(mut self, v: TimePerception) -> Self {
        self.time_perception = FieldUpdate::Set(v);
        self
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::{
        tracker::entities::{
            Axis, Effectiveness, Entry, EntryDraft, EntryPatch, FieldUpdate, MentalStateSpectrum,
            TestType, TimePerception, DRAWING_PROMPTS,
        },
        utils::percentage::Percentage,
    };

    #[test]
    fn test_merge_is_shallow() {
        let mut draft = EntryDraft::default();
        draft.merge(EntryPatch::default().activity("Reading"));
        draft.merge(EntryPatch::default().notes("calm"));
        assert_eq!(draft.activity.as_deref(), Some("Reading"));
        assert_eq!(draft.notes.as_deref(), Some("calm"));

        let focused = MentalStateSpectrum::NEUTRAL.with_axis(Axis::Focus, 90).unwrap();
        draft.merge(EntryPatch::default().mental_state(focused));
        let tired = MentalStateSpectrum {
            focus: 0,
            energy: 10,
            mood: 0,
            curiosity: 0,
        };
        draft.merge(EntryPatch::default().mental_state(tired));
        // Nested values are replaced, not merged with the previous snapshot
        assert_eq!(draft.mental_state, Some(tired));
    }

    #[test]
    fn test_merge_clear() {
        let mut draft = EntryDraft {
            drawing: Some("strokes".into()),
            activity: Some("Writing".into()),
            ..Default::default()
        };
        draft.merge(EntryPatch {
            drawing: FieldUpdate::Clear,
            ..Default::default()
        });
        assert_eq!(draft.drawing, None);
        assert_eq!(draft.activity.as_deref(), Some("Writing"));
    }

    #[test]
    fn test_draft_is_empty() {
        assert!(EntryDraft::default().is_empty());
        let blank = EntryDraft {
            activity: Some("  ".into()),
            notes: Some(String::new()),
            ..Default::default()
        };
        assert!(blank.is_empty());
        let rated = EntryDraft {
            effectiveness: Some(Effectiveness::new(3).unwrap()),
            ..Default::default()
        };
        assert!(!rated.is_empty());
    }

    #[test]
    fn test_axis_bounds() {
        assert!(MentalStateSpectrum::NEUTRAL.with_axis(Axis::Mood, 100).is_ok());
        assert!(MentalStateSpectrum::NEUTRAL.with_axis(Axis::Mood, 101).is_err());
        assert!(Effectiveness::new(0).is_err());
        assert!(Effectiveness::new(11).is_err());
        assert!(serde_json::from_str::<Effectiveness>("12").is_err());
        assert!(serde_json::from_str::<MentalStateSpectrum>(
            r#"{"focus":10,"energy":200,"mood":0,"curiosity":0}"#
        )
        .is_err());
    }

    #[test]
    fn test_test_type_cycle() {
        let mut test = TestType::Drawing;
        for _ in 0..4 {
            test = test.next();
        }
        assert_eq!(test, TestType::Drawing);
        assert_eq!(TestType::Drawing.next(), TestType::Counting);
        assert_eq!(TestType::Tapping.next(), TestType::Drawing);
    }

    #[test]
    fn test_prompts() {
        for _ in 0..10 {
            let prompt = TestType::Drawing.prompt().unwrap();
            assert!(DRAWING_PROMPTS.contains(&prompt));
        }
        assert_eq!(TestType::Tapping.prompt(), None);
    }

    #[test]
    fn test_entry_json_shape() {
        let entry = Entry {
            id: "abc".into(),
            timestamp: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
            fields: EntryDraft {
                activity: Some("Reading".into()),
                time_perception: Some(TimePerception {
                    actual: 45.,
                    perceived: 30.,
                    test_type: TestType::Drawing,
                    accuracy: Percentage::new_opt(50.).unwrap(),
                }),
                ..Default::default()
            },
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "abc",
                "timestamp": "2025-01-02T03:04:05Z",
                "activity": "Reading",
                "timePerception": {
                    "actual": 45.0,
                    "perceived": 30.0,
                    "testType": "drawing",
                    "accuracy": 50.0,
                }
            })
        );

        let parsed: Entry = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, entry);
    }
}
