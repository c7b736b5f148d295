//! Corrective guidance for the player.
//!
//! | offset          | message             | urgency | action            |
//! |-----------------|---------------------|---------|-------------------|
//! | ≤ 5 cents       | In Tune             | Perfect | Hold              |
//! | ≤ 10 cents      | Slightly Flat/Sharp | Low     | Tighten / Loosen  |
//! | ≤ 25 cents      | Flat/Sharp          | Medium  | Tighten / Loosen  |
//! | beyond          | Very Flat/Sharp     | High    | Tighten / Loosen  |
//!
//! Raising pitch means tightening the string, so flat readings ask for
//! `Tighten` and sharp ones for `Loosen`.

use serde::Serialize;

use crate::matcher::Direction;

const IN_TUNE_CENTS: f64 = 5.0;
const SLIGHT_CENTS: f64 = 10.0;
const MODERATE_CENTS: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Urgency {
    Perfect,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TuningAction {
    Hold,
    Tighten,
    Loosen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Guidance {
    pub message: &'static str,
    pub urgency: Urgency,
    pub action: TuningAction,
}

/// Maps an offset and its direction to a guidance tier.
///
/// If `direction` says `Perfect` but `cents` lies outside the in-tune tier
/// (the raw and smoothed readings disagree), the sign of `cents` decides.
pub fn guidance(cents: f64, direction: Direction) -> Guidance {
    let offset = cents.abs();
    if offset <= IN_TUNE_CENTS {
        return Guidance {
            message: "In Tune",
            urgency: Urgency::Perfect,
            action: TuningAction::Hold,
        };
    }

    let flat = match direction {
        Direction::Flat => true,
        Direction::Sharp => false,
        Direction::Perfect => cents < 0.0,
    };
    let action = if flat {
        TuningAction::Tighten
    } else {
        TuningAction::Loosen
    };

    let (message, urgency) = match (offset, flat) {
        (o, true) if o <= SLIGHT_CENTS => ("Slightly Flat", Urgency::Low),
        (o, false) if o <= SLIGHT_CENTS => ("Slightly Sharp", Urgency::Low),
        (o, true) if o <= MODERATE_CENTS => ("Flat", Urgency::Medium),
        (o, false) if o <= MODERATE_CENTS => ("Sharp", Urgency::Medium),
        (_, true) => ("Very Flat", Urgency::High),
        (_, false) => ("Very Sharp", Urgency::High),
    };

    Guidance {
        message,
        urgency,
        action,
    }
}
