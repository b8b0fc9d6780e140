use crate::utils::percentage::Percentage;

/// Score of a single time estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub difference_seconds: f64,
    pub accuracy: Percentage,
}

/// Compares the duration the user waited with the duration they were aiming for. Accuracy drops
/// linearly with the relative error and floors at 0 once the error reaches 100%.
///
/// `target_seconds` has to be positive, which holds for every [TestType](super::entities::TestType).
pub fn evaluate(target_seconds: f64, actual_seconds: f64) -> Evaluation {
    debug_assert!(target_seconds > 0., "Target of a test should always be positive");
    let difference_seconds = (actual_seconds - target_seconds).abs();
    let accuracy = Percentage::clamped(100. - difference_seconds / target_seconds * 100.);
    Evaluation {
        difference_seconds,
        accuracy,
    }
}

/// Rough verdict on an accuracy score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerceptionRating {
    Excellent,
    Good,
    Off,
}

impl PerceptionRating {
    pub fn from_accuracy(accuracy: Percentage) -> Self {
        if *accuracy >= 90. {
            PerceptionRating::Excellent
        } else if *accuracy >= 70. {
            PerceptionRating::Good
        } else {
            PerceptionRating::Off
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            PerceptionRating::Excellent => "Excellent time perception!",
            PerceptionRating::Good => "Good time perception, but room for improvement.",
            PerceptionRating::Off => "Your time perception was quite different from actual time.",
        }
    }
}
