//! Pure per-channel mode objects for the Reactivity Router (SPEC_FULL.md
//! §4.7). Each mode is a function of `(state, input, current params) -> (new
//! state, param deltas)`; the router owns instances of these and applies
//! their output to the Parameter Store.

use std::collections::VecDeque;

use rand::Rng;

use crate::params::ParamField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerMode
{
        #[default]
        Off,
        Rotations,
        Velocity,
        Distance,
}

impl PointerMode
{
        pub fn parse(name: &str) -> Option<Self>
        {
                match name
                {
                        "off" => Some(Self::Off),
                        "rotations" => Some(Self::Rotations),
                        "velocity" => Some(Self::Velocity),
                        "distance" => Some(Self::Distance),
                        _ => None,
                }
        }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClickMode
{
        #[default]
        Off,
        Burst,
        Blast,
        Ripple,
}

impl ClickMode
{
        pub fn parse(name: &str) -> Option<Self>
        {
                match name
                {
                        "off" => Some(Self::Off),
                        "burst" => Some(Self::Burst),
                        "blast" => Some(Self::Blast),
                        "ripple" => Some(Self::Ripple),
                        _ => None,
                }
        }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WheelMode
{
        #[default]
        Off,
        Cycle,
        Wave,
        Sweep,
}

impl WheelMode
{
        pub fn parse(name: &str) -> Option<Self>
        {
                match name
                {
                        "off" => Some(Self::Off),
                        "cycle" => Some(Self::Cycle),
                        "wave" => Some(Self::Wave),
                        "sweep" => Some(Self::Sweep),
                        _ => None,
                }
        }
}

/// Absolute pointer-set deltas: these REPLACE the field rather than adding to
/// it, matching the `Rotations`/`Distance` formulas in SPEC_FULL.md §4.7.
pub fn pointer_rotations(
        x: f64,
        y: f64,
        base_hue: f64,
) -> Vec<(ParamField, f64)>
{
        use std::f64::consts::PI;
        vec![
                (ParamField::Rot4dXw, (x - 0.5) * 4.0 * PI),
                (ParamField::Rot4dYw, (x - 0.5) * 2.8 * PI),
                (ParamField::Rot4dZw, (y - 0.5) * 4.0 * PI),
                (ParamField::Hue, base_hue + (x - 0.5) * 30.0),
        ]
}

pub fn pointer_distance(
        x: f64,
        y: f64,
) -> Vec<(ParamField, f64)>
{
        let raw = ((x - 0.5).powi(2) + (y - 0.5).powi(2)).sqrt();
        let d = (raw / 0.707).min(1.0);

        vec![
                (ParamField::GridDensity, 5.0 + 95.0 * d),
                (ParamField::Intensity, 0.2 + 0.8 * (1.0 - d)),
                (ParamField::Saturation, 0.4 + 0.6 * (1.0 - d)),
                (ParamField::Hue, 320.0 + 40.0 * d),
        ]
}

/// Rolling state for `Velocity` pointer mode: a window of the last 5
/// Euclidean position deltas.
#[derive(Debug, Default)]
pub struct VelocityState
{
        last_pos: Option<(f64, f64)>,
        deltas: VecDeque<f64>,
}

impl VelocityState
{
        const WINDOW: usize = 5;

        pub fn sample(
                &mut self,
                x: f64,
                y: f64,
        ) -> Vec<(ParamField, f64)>
        {
                if let Some((lx, ly)) = self.last_pos
                {
                        let d = ((x - lx).powi(2) + (y - ly).powi(2)).sqrt();
                        if self.deltas.len() == Self::WINDOW
                        {
                                self.deltas.pop_front();
                        }
                        self.deltas.push_back(d);
                }
                self.last_pos = Some((x, y));

                let mean = if self.deltas.is_empty()
                {
                        0.0
                }
                else
                {
                        self.deltas.iter().sum::<f64>() / self.deltas.len() as f64
                };

                vec![
                        (ParamField::Chaos, (mean * 30.0).clamp(0.0, 1.0)),
                        (ParamField::Speed, (0.5 + mean * 15.0).clamp(0.5, 3.0)),
                        (ParamField::GridDensity, 10.0 + y * 90.0),
                        (ParamField::Intensity, 0.4 + x * 0.6),
                        (ParamField::Hue, 280.0 + mean * 80.0),
                ]
        }
}

/// One decaying effect slot driven by a click. `amplitude` is the additive
/// delta applied to `field` this frame; it is multiplied by `decay` after
/// each application and the slot is dropped once it falls under `0.01`.
#[derive(Debug, Clone, Copy)]
pub struct EffectSlot
{
        pub field: ParamField,
        pub amplitude: f64,
        pub decay: f64,
}

impl EffectSlot
{
        /// Applies this frame's delta and decays. Returns `None` once the
        /// effect has faded below the stop threshold.
        pub fn tick(mut self) -> Option<(ParamField, f64, Self)>
        {
                let delta = self.amplitude;
                self.amplitude *= self.decay;
                if self.amplitude.abs() < 0.01
                {
                        None
                }
                else
                {
                        Some((self.field, delta, self))
                }
        }
}

pub fn burst_effects() -> Vec<EffectSlot>
{
        vec![
                EffectSlot {
                        field: ParamField::Chaos,
                        amplitude: 0.8,
                        decay: 0.92,
                },
                EffectSlot {
                        field: ParamField::Speed,
                        amplitude: 1.5,
                        decay: 0.91,
                },
        ]
}

pub fn blast_effects() -> Vec<EffectSlot>
{
        vec![
                EffectSlot {
                        field: ParamField::Chaos,
                        amplitude: 0.3,
                        decay: 0.88,
                },
                EffectSlot {
                        field: ParamField::Speed,
                        amplitude: 1.0,
                        decay: 0.89,
                },
                EffectSlot {
                        field: ParamField::Hue,
                        amplitude: 60.0,
                        decay: 0.90,
                },
        ]
}

/// `d` is the click's normalized distance from the surface center.
pub fn ripple_effects(d: f64) -> Vec<EffectSlot>
{
        vec![EffectSlot {
                field: ParamField::MorphFactor,
                amplitude: 0.1 + 0.2 * (1.0 - d),
                decay: 0.9,
        }]
}

pub fn wheel_cycle(dy: f64) -> Vec<(ParamField, f64)>
{
        let sign = dy.signum();
        vec![(ParamField::GridDensity, sign * 0.8), (ParamField::Hue, sign * 3.0)]
}

pub fn wheel_wave(dy: f64) -> Vec<(ParamField, f64)>
{
        vec![(ParamField::MorphFactor, dy.signum() * 0.02)]
}

/// Focus fields rotated through by `Sweep` wheel mode, in order.
pub const SWEEP_FIELDS: [ParamField; 5] = [
        ParamField::Hue,
        ParamField::Intensity,
        ParamField::Saturation,
        ParamField::Chaos,
        ParamField::Speed,
];

fn sweep_step(field: ParamField) -> f64
{
        match field
        {
                ParamField::Hue => 360.0 * 0.02,
                ParamField::Intensity | ParamField::Saturation | ParamField::Chaos => 1.0 * 0.02,
                ParamField::Speed => (3.0 - 0.1) * 0.02,
                _ => 0.0,
        }
}

/// Rotating-focus wheel accumulator: advances to the next field with 10%
/// probability per wheel event (SPEC_FULL.md §4.7).
#[derive(Debug, Default)]
pub struct SweepState
{
        focus: usize,
}

impl SweepState
{
        pub fn apply(
                &mut self,
                dy: f64,
                rng: &mut impl Rng,
        ) -> Vec<(ParamField, f64)>
        {
                let field = SWEEP_FIELDS[self.focus % SWEEP_FIELDS.len()];
                let delta = dy.signum() * sweep_step(field);

                if rng.random_bool(0.10)
                {
                        self.focus = (self.focus + 1) % SWEEP_FIELDS.len();
                }

                vec![(field, delta)]
        }
}

#[cfg(test)]
mod tests
{
        use super::*;

        #[test]
        fn distance_mode_at_center_matches_scenario_2()
        {
                let deltas = pointer_distance(0.5, 0.5);
                let map: std::collections::HashMap<_, _> = deltas.into_iter().collect();
                assert!((map[&ParamField::GridDensity] - 5.0).abs() < 1e-9);
                assert!((map[&ParamField::Intensity] - 1.0).abs() < 1e-9);
                assert!((map[&ParamField::Saturation] - 1.0).abs() < 1e-9);
                assert!((map[&ParamField::Hue] - 320.0).abs() < 1e-9);
        }

        #[test]
        fn cycle_wheel_ten_positive_ticks_matches_scenario_3()
        {
                let mut grid = 15.0;
                let mut hue = 200.0;
                for _ in 0..10
                {
                        for (field, delta) in wheel_cycle(1.0)
                        {
                                match field
                                {
                                        ParamField::GridDensity => grid += delta,
                                        ParamField::Hue => hue += delta,
                                        _ => unreachable!(),
                                }
                        }
                }
                assert!((grid - 23.0).abs() < 1e-9);
                assert!((hue - 230.0).abs() < 1e-9);
        }

        #[test]
        fn burst_effects_decay_below_threshold_and_stop()
        {
                let mut slots = burst_effects();
                let mut iterations = 0;
                while !slots.is_empty() && iterations < 1000
                {
                        slots = slots.into_iter().filter_map(|s| s.tick().map(|(_, _, next)| next)).collect();
                        iterations += 1;
                }
                assert!(slots.is_empty());
        }

        #[test]
        fn velocity_mode_reports_zero_chaos_until_second_sample()
        {
                let mut state = VelocityState::default();
                let first = state.sample(0.5, 0.5);
                let chaos = first.iter().find(|(f, _)| *f == ParamField::Chaos).unwrap().1;
                assert_eq!(chaos, 0.0);
        }

        #[test]
        fn sweep_focus_advances_eventually_with_biased_rng()
        {
                struct AlwaysAdvance;
                impl rand::RngCore for AlwaysAdvance
                {
                        fn next_u32(&mut self) -> u32
                        {
                                0
                        }
                        fn next_u64(&mut self) -> u64
                        {
                                0
                        }
                        fn fill_bytes(
                                &mut self,
                                dest: &mut [u8],
                        )
                        {
                                dest.fill(0);
                        }
                }

                let mut rng = AlwaysAdvance;
                let mut sweep = SweepState::default();
                let before = sweep.focus;
                sweep.apply(1.0, &mut rng);
                assert_ne!(sweep.focus, before);
        }
}
