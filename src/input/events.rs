//! Normalized input events (SPEC_FULL.md §4.6, data model `InputEvent`).
//!
//! Producers only normalize and enqueue; they never map to parameters
//! themselves — that is the Reactivity Router's job exclusively.

use crate::audio::AudioFeatures;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent
{
        /// Pointer position, normalized to `[0,1]` against the active
        /// engine's surface bounds, plus a pressed-buttons bitmask.
        Pointer
        {
                x: f64, y: f64, buttons: u8
        },
        PointerEnd,
        Wheel
        {
                dy: f64
        },
        /// Device-orientation angles in degrees. Never produced by the real
        /// native host (desktop has no accelerometer source) — see
        /// SPEC_FULL.md §4.6 — but kept in the event enum for test harnesses
        /// and a future input source.
        Motion
        {
                alpha: f64, beta: f64, gamma: f64
        },
        AudioFrame(AudioFeatures),
}

pub const LEFT_BUTTON: u8 = 0b0000_0001;
