//! The Reactivity Router: single place mapping `InputEvent`s to `Params`
//! updates, arbitrating with per-engine native reactivity (SPEC_FULL.md
//! §4.7).

use rand::{rngs::ThreadRng, Rng};

use crate::{
        engine_id::EngineId,
        input::{
                events::InputEvent,
                modes::{
                        blast_effects, burst_effects, pointer_distance, pointer_rotations,
                        ripple_effects, wheel_cycle, wheel_wave, ClickMode, EffectSlot, PointerMode,
                        SweepState, VelocityState, WheelMode,
                },
        },
        params::{ParamField, SharedStore},
};

pub struct RouterConfig
{
        pub master_enabled: bool,
        pub pointer_mode: PointerMode,
        pub click_mode: ClickMode,
        pub wheel_mode: WheelMode,
}

impl Default for RouterConfig
{
        fn default() -> Self
        {
                Self {
                        master_enabled: true,
                        pointer_mode: PointerMode::Rotations,
                        click_mode: ClickMode::Burst,
                        wheel_mode: WheelMode::Cycle,
                }
        }
}

/// Owns the per-channel mode state and applies deltas to the store on behalf
/// of whichever engine the scheduler reports as active.
pub struct ReactivityRouter
{
        store: SharedStore,
        config: RouterConfig,
        active_engine: Option<EngineId>,
        velocity_state: VelocityState,
        sweep_state: SweepState,
        click_effects: Vec<EffectSlot>,
        rng: ThreadRng,
}

impl std::fmt::Debug for ReactivityRouter
{
        fn fmt(
                &self,
                f: &mut std::fmt::Formatter<'_>,
        ) -> std::fmt::Result
        {
                f.debug_struct("ReactivityRouter")
                        .field("active_engine", &self.active_engine)
                        .field("click_effects_live", &self.click_effects.len())
                        .finish()
        }
}

impl ReactivityRouter
{
        pub fn new(
                store: SharedStore,
                config: RouterConfig,
        ) -> Self
        {
                Self {
                        store,
                        config,
                        active_engine: None,
                        velocity_state: VelocityState::default(),
                        sweep_state: SweepState::default(),
                        click_effects: Vec::new(),
                        rng: rand::rng(),
                }
        }

        /// Called by the scheduler on every `switch_to` (SPEC_FULL.md §4.5
        /// step 9) so the router always arbitrates for the right engine.
        pub fn set_active_engine(
                &mut self,
                engine: Option<EngineId>,
        )
        {
                self.active_engine = engine;
                self.click_effects.clear();
        }

        pub fn has_live_click_effects(&self) -> bool
        {
                !self.click_effects.is_empty()
        }

        /// Routes one input event to the active engine's parameters. No-op
        /// if the router is disabled, no engine is active, or the channel's
        /// mode is `Off`. Never panics (SPEC_FULL.md §4.7 failure semantics).
        pub fn handle_event(
                &mut self,
                event: InputEvent,
        )
        {
                if !self.config.master_enabled
                {
                        return;
                }

                let Some(engine) = self.active_engine
                else
                {
                        return;
                };

                match event
                {
                        InputEvent::Pointer {
                                x,
                                y,
                                ..
                        } => self.route_pointer(engine, x, y),
                        InputEvent::PointerEnd => self.route_click(engine, 0.5, 0.5),
                        InputEvent::Wheel {
                                dy,
                        } => self.route_wheel(engine, dy),
                        InputEvent::Motion {
                                ..
                        } =>
                        {}
                        InputEvent::AudioFrame(features) => self.route_audio(engine, features),
                }
        }

        fn route_pointer(
                &mut self,
                engine: EngineId,
                x: f64,
                y: f64,
        )
        {
                let deltas = match self.config.pointer_mode
                {
                        PointerMode::Off => return,
                        PointerMode::Rotations => pointer_rotations(x, y, engine.hue_offset()),
                        PointerMode::Velocity => self.velocity_state.sample(x, y),
                        PointerMode::Distance => pointer_distance(x, y),
                };
                self.apply_sets(engine, &deltas);
        }

        /// `x`/`y` are the click location; used by `Ripple` to derive the
        /// center distance.
        fn route_click(
                &mut self,
                engine: EngineId,
                x: f64,
                y: f64,
        )
        {
                let d = (((x - 0.5).powi(2) + (y - 0.5).powi(2)).sqrt() / 0.707).min(1.0);

                let new_effects = match self.config.click_mode
                {
                        ClickMode::Off => return,
                        ClickMode::Burst => burst_effects(),
                        ClickMode::Blast => blast_effects(),
                        ClickMode::Ripple => ripple_effects(d),
                };
                self.click_effects.extend(new_effects);
                let _ = engine;
        }

        fn route_wheel(
                &mut self,
                engine: EngineId,
                dy: f64,
        )
        {
                if dy == 0.0
                {
                        return;
                }

                let deltas = match self.config.wheel_mode
                {
                        WheelMode::Off => return,
                        WheelMode::Cycle => wheel_cycle(dy),
                        WheelMode::Wave => wheel_wave(dy),
                        WheelMode::Sweep => self.sweep_state.apply(dy, &mut self.rng),
                };
                self.apply_adds(engine, &deltas);
        }

        /// Audio-reactive mapping per SPEC_FULL.md §8 scenario 6: each band
        /// drives a distinct field off the engine's baseline — bass drives
        /// intensity, mid drives hue, high drives morphFactor.
        fn route_audio(
                &mut self,
                engine: EngineId,
                features: crate::audio::AudioFeatures,
        )
        {
                if features.energy < crate::audio::SILENCE_THRESHOLD
                {
                        return;
                }

                let mut store = self.store.borrow_mut();
                let base_hue = engine.hue_offset();
                let base_intensity = engine.default_params().intensity;
                let base_morph = engine.default_params().morph_factor;

                store.set(engine, ParamField::Hue, base_hue + features.mid * 120.0);
                store.set(engine, ParamField::MorphFactor, base_morph + features.high * 1.0);
                store.set(engine, ParamField::Intensity, base_intensity + features.bass * 0.3);
        }

        /// Advances the click-decay loop by one frame; called once per
        /// scheduler tick. Stops automatically once every effect has decayed
        /// past the `0.01` threshold (SPEC_FULL.md §4.7).
        pub fn tick_effects(
                &mut self,
                engine: EngineId,
        )
        {
                if self.click_effects.is_empty()
                {
                        return;
                }

                let mut store = self.store.borrow_mut();
                let mut next = Vec::with_capacity(self.click_effects.len());

                for slot in std::mem::take(&mut self.click_effects)
                {
                        if let Some((field, delta, remaining)) = slot.tick()
                        {
                                let current = store.get(engine, field);
                                store.set(engine, field, current + delta);
                                next.push(remaining);
                        }
                }

                self.click_effects = next;
        }

        fn apply_sets(
                &mut self,
                engine: EngineId,
                deltas: &[(ParamField, f64)],
        )
        {
                let mut store = self.store.borrow_mut();
                for &(field, value) in deltas
                {
                        store.set(engine, field, value);
                }
        }

        fn apply_adds(
                &mut self,
                engine: EngineId,
                deltas: &[(ParamField, f64)],
        )
        {
                let mut store = self.store.borrow_mut();
                for &(field, delta) in deltas
                {
                        let current = store.get(engine, field);
                        store.set(engine, field, current + delta);
                }
        }
}

#[cfg(test)]
mod tests
{
        use super::*;
        use crate::params::new_shared_store;

        fn make_router(config: RouterConfig) -> ReactivityRouter
        {
                let store = new_shared_store();
                let mut router = ReactivityRouter::new(store, config);
                router.set_active_engine(Some(EngineId::Quantum));
                router
        }

        #[test]
        fn disabled_master_switch_ignores_events()
        {
                let mut router = make_router(RouterConfig {
                        master_enabled: false,
                        ..Default::default()
                });
                let before = router.store.borrow().snapshot(EngineId::Quantum);
                router.handle_event(InputEvent::Wheel {
                        dy: 5.0,
                });
                let after = router.store.borrow().snapshot(EngineId::Quantum);
                assert_eq!(before, after);
        }

        #[test]
        fn zero_wheel_delta_is_a_no_op()
        {
                let mut router = make_router(RouterConfig::default());
                let before = router.store.borrow().snapshot(EngineId::Quantum);
                router.handle_event(InputEvent::Wheel {
                        dy: 0.0,
                });
                let after = router.store.borrow().snapshot(EngineId::Quantum);
                assert_eq!(before, after);
        }

        #[test]
        fn click_burst_starts_and_eventually_drains_effects()
        {
                let mut router = make_router(RouterConfig::default());
                router.handle_event(InputEvent::PointerEnd);
                assert!(router.has_live_click_effects());

                for _ in 0..500
                {
                        router.tick_effects(EngineId::Quantum);
                }
                assert!(!router.has_live_click_effects());
        }

        #[test]
        fn no_active_engine_is_inert()
        {
                let store = new_shared_store();
                let mut router = ReactivityRouter::new(store, RouterConfig::default());
                router.handle_event(InputEvent::Wheel {
                        dy: 1.0,
                });
                assert!(!router.has_live_click_effects());
        }

        #[test]
        fn audio_frame_matches_scenario_6()
        {
                let mut router = make_router(RouterConfig::default());
                router.handle_event(InputEvent::AudioFrame(crate::audio::AudioFeatures {
                        bass: 0.9,
                        mid: 0.1,
                        high: 0.1,
                        energy: 0.8,
                        ..Default::default()
                }));

                let params = router.store.borrow().snapshot(EngineId::Quantum);
                assert!((params.hue - 292.0).abs() < 1e-9);
                assert!((params.morph_factor - 1.10).abs() < 1e-9);
                assert!((params.intensity - 0.97).abs() < 1e-9);
        }

        #[test]
        fn silent_audio_frame_is_a_no_op()
        {
                let mut router = make_router(RouterConfig::default());
                let before = router.store.borrow().snapshot(EngineId::Quantum);
                router.handle_event(InputEvent::AudioFrame(crate::audio::AudioFeatures {
                        energy: 0.0,
                        ..Default::default()
                }));
                let after = router.store.borrow().snapshot(EngineId::Quantum);
                assert_eq!(before, after);
        }
}
