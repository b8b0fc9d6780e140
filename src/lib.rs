//! Small terminal journal for keeping track of your mental state. Every entry can hold how
//! focused, energetic, calm and curious you feel, what you are doing and how well it goes, and the
//! result of a short exercise checking how well you sense time passing.
//!

pub mod cli;
pub mod tracker;
pub mod utils;
