use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::utils::clock::Clock;

use super::{
    canvas::{has_strokes, DrawingCanvas},
    entities::{EntryPatch, TestType, TimePerception},
    evaluator::{evaluate, Evaluation},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestState {
    Idle,
    Running { started: Instant },
    Completed,
}

/// What happened to the drawing when a test finished.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawingCapture {
    /// The test wasn't a drawing test.
    NotApplicable,
    /// Nothing was drawn.
    Empty,
    Captured(String),
    /// The canvas couldn't be read. The message is meant for the user.
    Failed(String),
}

impl DrawingCapture {
    pub fn into_drawing(self) -> Option<String> {
        match self {
            DrawingCapture::Captured(v) => Some(v),
            DrawingCapture::NotApplicable | DrawingCapture::Empty | DrawingCapture::Failed(_) => {
                None
            }
        }
    }
}

/// Everything a finished test produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TestOutcome {
    pub evaluation: Evaluation,
    pub perception: TimePerception,
    pub drawing: DrawingCapture,
}

impl TestOutcome {
    /// Patch for the draft. A completed test always replaces the previous drawing, so tests
    /// without one clear it.
    pub fn to_patch(&self) -> EntryPatch {
        EntryPatch::default()
            .time_perception(self.perception.clone())
            .drawing(self.drawing.clone().into_drawing())
    }
}

/// Drives a single time perception exercise: Idle → Running → Completed, then either a new
/// attempt or the next test type.
pub struct TestSession<C: DrawingCanvas> {
    test: TestType,
    state: TestState,
    result: Option<Evaluation>,
    taps: u32,
    canvas: C,
    clock: Box<dyn Clock>,
}

impl<C: DrawingCanvas> TestSession<C> {
    pub fn new(test: TestType, canvas: C, clock: Box<dyn Clock>) -> Self {
        Self {
            test,
            state: TestState::Idle,
            result: None,
            taps: 0,
            canvas,
            clock,
        }
    }

    pub fn test(&self) -> TestType {
        self.test
    }

    pub fn state(&self) -> TestState {
        self.state
    }

    pub fn result(&self) -> Option<&Evaluation> {
        self.result.as_ref()
    }

    pub fn taps(&self) -> u32 {
        self.taps
    }

    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }

    /// Starts a new attempt, dropping any previous result.
    pub fn start(&mut self) {
        if matches!(self.state, TestState::Running { .. }) {
            debug!("Restarting running {} test", self.test);
        }
        self.result = None;
        self.taps = 0;
        if self.test == TestType::Drawing {
            self.canvas.clear();
        }
        self.state = TestState::Running {
            started: self.clock.instant(),
        };
        info!("Started {} test", self.test);
    }

    /// Counts a tap. Only the tapping test counts taps, and only while it runs.
    pub fn tap(&mut self) {
        if self.test == TestType::Tapping && matches!(self.state, TestState::Running { .. }) {
            self.taps += 1;
        }
    }

    /// Finishes the running attempt. Without a recorded start there is nothing to finish.
    pub fn stop(&mut self) -> Option<TestOutcome> {
        let TestState::Running { started } = self.state else {
            debug!("Stop requested for a test that isn't running");
            return None;
        };

        let actual = self
            .clock
            .instant()
            .saturating_duration_since(started)
            .as_secs_f64();
        let target = self.test.target_seconds();
        let evaluation = evaluate(target, actual);
        let drawing = self.capture_drawing();

        self.state = TestState::Completed;
        self.result = Some(evaluation);
        info!(
            "Finished {} test in {actual}s with accuracy {}",
            self.test, evaluation.accuracy
        );

        Some(TestOutcome {
            evaluation,
            perception: TimePerception {
                actual,
                perceived: target,
                test_type: self.test,
                accuracy: evaluation.accuracy,
            },
            drawing,
        })
    }

    /// Throws away a running attempt without producing anything.
    pub fn abandon(&mut self) -> bool {
        if matches!(self.state, TestState::Running { .. }) {
            self.state = TestState::Idle;
            self.taps = 0;
            info!("Abandoned {} test", self.test);
            true
        } else {
            false
        }
    }

    /// Moves to the next test type. A running attempt has to be stopped or abandoned first.
    pub fn next_test(&mut self) -> TestType {
        if matches!(self.state, TestState::Running { .. }) {
            return self.test;
        }
        self.test = self.test.next();
        self.state = TestState::Idle;
        self.result = None;
        self.taps = 0;
        self.test
    }

    fn capture_drawing(&mut self) -> DrawingCapture {
        if self.test != TestType::Drawing {
            return DrawingCapture::NotApplicable;
        }
        match self.canvas.serialized_content() {
            Ok(content) if has_strokes(&content) => DrawingCapture::Captured(content),
            Ok(_) => DrawingCapture::Empty,
            Err(e) => {
                warn!("Failed to capture drawing {e:?}");
                DrawingCapture::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::anyhow;

    use crate::{
        tracker::{
            canvas::{MockDrawingCanvas, TextCanvas},
            entities::{EntryDraft, FieldUpdate, TestType},
            session::{DrawingCapture, TestSession, TestState},
        },
        utils::{clock::DefaultClock, logging::TEST_LOGGING, percentage::Percentage},
    };

    fn session<C: super::DrawingCanvas>(test: TestType, canvas: C) -> TestSession<C> {
        TestSession::new(test, canvas, Box::new(DefaultClock))
    }

    #[tokio::test(start_paused = true)]
    async fn test_counting_run() {
        *TEST_LOGGING;
        let mut canvas = MockDrawingCanvas::new();
        canvas.expect_clear().never();
        canvas.expect_serialized_content().never();
        let mut session = session(TestType::Counting, canvas);

        session.start();
        tokio::time::advance(Duration::from_secs(25)).await;
        let outcome = session.stop().unwrap();

        assert_eq!(session.state(), TestState::Completed);
        assert_eq!(outcome.perception.actual, 25.);
        assert_eq!(outcome.perception.perceived, 20.);
        assert_eq!(outcome.perception.test_type, TestType::Counting);
        assert_eq!(*outcome.perception.accuracy, 75.);
        assert_eq!(outcome.evaluation.difference_seconds, 5.);
        assert_eq!(outcome.drawing, DrawingCapture::NotApplicable);
        assert_eq!(session.result(), Some(&outcome.evaluation));

        let patch = outcome.to_patch();
        assert_eq!(patch.drawing, FieldUpdate::Clear);
        assert_eq!(
            patch.time_perception,
            FieldUpdate::Set(outcome.perception.clone())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_drawing_run_captures_strokes() {
        let mut session = session(TestType::Drawing, TextCanvas::new());
        session.canvas_mut().draw_line("left over from before");

        session.start();
        session.canvas_mut().draw_line("~~~ ~~~");
        tokio::time::advance(Duration::from_secs(30)).await;
        let outcome = session.stop().unwrap();

        assert_eq!(outcome.perception.accuracy, Percentage::FULL);
        let DrawingCapture::Captured(content) = &outcome.drawing else {
            panic!("Expected a drawing, got {:?}", outcome.drawing);
        };
        // The canvas is cleared on start, so only the new stroke remains
        assert!(!content.contains("left over"));
        assert_eq!(content.matches("points").count(), 1);

        let mut draft = EntryDraft::default();
        draft.merge(outcome.to_patch());
        assert_eq!(draft.drawing.as_ref(), Some(content));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drawing_run_without_strokes() {
        let mut session = session(TestType::Drawing, TextCanvas::new());
        session.start();
        tokio::time::advance(Duration::from_secs(10)).await;
        let outcome = session.stop().unwrap();
        assert_eq!(outcome.drawing, DrawingCapture::Empty);
        assert_eq!(outcome.to_patch().drawing, FieldUpdate::Clear);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drawing_capture_failure_is_not_fatal() {
        let mut canvas = MockDrawingCanvas::new();
        canvas.expect_clear().times(1).return_const(());
        canvas
            .expect_serialized_content()
            .times(1)
            .returning(|| Err(anyhow!("canvas went away")));
        let mut session = session(TestType::Drawing, canvas);

        session.start();
        tokio::time::advance(Duration::from_secs(31)).await;
        let outcome = session.stop().unwrap();

        assert_eq!(
            outcome.drawing,
            DrawingCapture::Failed("canvas went away".into())
        );
        assert_eq!(outcome.drawing.clone().into_drawing(), None);
        assert_eq!(outcome.perception.actual, 31.);
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let mut session = session(TestType::Meditation, TextCanvas::new());
        assert!(session.stop().is_none());
        assert_eq!(session.state(), TestState::Idle);
        assert!(session.result().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandon_discards_run() {
        let mut session = session(TestType::Tapping, TextCanvas::new());
        session.start();
        session.tap();
        session.tap();
        assert_eq!(session.taps(), 2);

        assert!(session.abandon());
        assert_eq!(session.state(), TestState::Idle);
        assert!(session.stop().is_none());
        assert!(session.result().is_none());
        assert!(!session.abandon());
    }

    #[tokio::test(start_paused = true)]
    async fn test_taps_only_count_while_tapping() {
        let mut session = session(TestType::Tapping, TextCanvas::new());
        session.tap();
        assert_eq!(session.taps(), 0);
        session.start();
        session.tap();
        session.stop();
        session.tap();
        assert_eq!(session.taps(), 1);

        let mut counting = self::session(TestType::Counting, TextCanvas::new());
        counting.start();
        counting.tap();
        assert_eq!(counting.taps(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_test_cycles() {
        let mut session = session(TestType::Drawing, TextCanvas::new());
        session.start();
        // Running tests stay where they are
        assert_eq!(session.next_test(), TestType::Drawing);
        session.stop();

        let order: Vec<_> = (0..4).map(|_| session.next_test()).collect();
        assert_eq!(
            order,
            vec![
                TestType::Counting,
                TestType::Meditation,
                TestType::Tapping,
                TestType::Drawing
            ]
        );
        assert_eq!(session.state(), TestState::Idle);
        assert!(session.result().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_attempt_clears_result() {
        let mut session = session(TestType::Counting, TextCanvas::new());
        session.start();
        tokio::time::advance(Duration::from_secs(20)).await;
        session.stop();
        assert!(session.result().is_some());

        session.start();
        assert!(session.result().is_none());
        assert!(matches!(session.state(), TestState::Running { .. }));
    }
}
