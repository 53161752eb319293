//! Engine Instance (C4): owns five renderers bound to its surfaces, drives a
//! render loop, and consumes parameter/audio input (SPEC_FULL.md §4.4).

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{
        audio::AudioFeatures,
        engine_id::EngineId,
        error::HostError,
        gpu::{device::SolidFieldRenderer, pool::ContextPool, LayerRenderer},
        params::{ParamField, SharedStore},
        surfaces::{surfaces_for, Surface},
};

/// One renderer bound to one surface. `SolidFieldRenderer` is the only
/// concrete [`LayerRenderer`] shipped — engine shader programs are out of
/// scope (SPEC_FULL.md §1 Non-goals, §9).
struct BoundRenderer
{
        surface: Surface,
        renderer: Box<dyn LayerRenderer>,
}

pub struct Engine
{
        pub id: EngineId,
        store: SharedStore,
        renderers: Vec<BoundRenderer>,
        active: bool,
        tick_count: u64,
        pending_audio: Option<AudioFeatures>,
        /// Sticky parameter overrides preserved across `set_variant`
        /// (SPEC_FULL.md §4.4 "variant vs. parameter split" / §9 open
        /// question). Dropped on `destroy`.
        overrides: HashMap<ParamField, f64>,
}

impl std::fmt::Debug for Engine
{
        fn fmt(
                &self,
                f: &mut std::fmt::Formatter<'_>,
        ) -> std::fmt::Result
        {
                f.debug_struct("Engine")
                        .field("id", &self.id)
                        .field("active", &self.active)
                        .field("tick_count", &self.tick_count)
                        .finish()
        }
}

impl Engine
{
        /// Acquires contexts for all five of `id`'s surfaces; on any failure,
        /// every already-acquired context is released before returning
        /// (SPEC_FULL.md §4.4 `create`).
        pub fn create(
                id: EngineId,
                store: SharedStore,
                pool: &mut ContextPool,
                viewport: (u32, u32),
        ) -> Result<Self, HostError>
        {
                let surfaces = surfaces_for(id);
                let mut acquired = Vec::with_capacity(5);

                for surface in &surfaces
                {
                        match pool.acquire(surface, viewport.0, viewport.1)
                        {
                                Ok(()) => acquired.push(surface.clone()),
                                Err(err) =>
                                {
                                        for done in &acquired
                                        {
                                                pool.release(done);
                                        }
                                        return Err(HostError::CreateFailed {
                                                engine: id,
                                                reason: err.to_string(),
                                        });
                                }
                        }
                }

                let renderers = surfaces
                        .into_iter()
                        .map(|surface| BoundRenderer {
                                surface,
                                renderer: Box::new(SolidFieldRenderer),
                        })
                        .collect();

                Ok(Self {
                        id,
                        store,
                        renderers,
                        active: false,
                        tick_count: 0,
                        pending_audio: None,
                        overrides: HashMap::new(),
                })
        }

        pub fn is_active(&self) -> bool
        {
                self.active
        }

        pub fn set_active(
                &mut self,
                active: bool,
        )
        {
                self.active = active;
        }

        pub fn surfaces(&self) -> impl Iterator<Item = &Surface>
        {
                self.renderers.iter().map(|r| &r.surface)
        }

        /// Checks every bound surface still validates against `pool`.
        pub fn is_healthy(
                &self,
                pool: &ContextPool,
        ) -> bool
        {
                self.renderers.iter().all(|r| pool.validate(&r.surface).is_ok())
        }

        /// One render frame. No-op when suspended (SPEC_FULL.md §4.4 `tick`).
        pub fn tick(
                &mut self,
                gpu: &crate::gpu::device::GpuHost,
                pool: &ContextPool,
        )
        {
                if !self.active
                {
                        return;
                }

                let mut params = self.store.borrow().snapshot(self.id);
                self.tick_count += 1;

                // Applies the queued audio frame as a local, render-only
                // modulation of intensity — distinct from the Reactivity
                // Router's own audio-driven writes to the Parameter Store
                // (SPEC_FULL.md §4.4 `tick`, §4.7).
                if let Some(audio) = self.pending_audio.take()
                {
                        params.intensity = (params.intensity + audio.peak * 0.1).clamp(0.0, 1.0);
                }

                for bound in &mut self.renderers
                {
                        if let Some(ctx) = pool.context(&bound.surface)
                        {
                                bound.renderer.draw(&gpu.device, &gpu.queue, &ctx.view, &params);
                        }
                }
        }

        pub fn update_param(
                &mut self,
                field: ParamField,
                value: f64,
        )
        {
                self.store.borrow_mut().set(self.id, field, value);
                self.overrides.insert(field, value);
        }

        pub fn apply_audio(
                &mut self,
                features: AudioFeatures,
        )
        {
                self.pending_audio = Some(features);
        }

        /// Sets `variant`, re-seeds role-local parameters to the variant's
        /// baseline, then re-applies any sticky overrides recorded via
        /// `update_param` (SPEC_FULL.md §4.4, §8 scenario 4).
        pub fn set_variant(
                &mut self,
                variant: i32,
        )
        {
                {
                        let mut store = self.store.borrow_mut();
                        store.set(self.id, ParamField::Variant, variant as f64);
                }

                let overrides: Vec<(ParamField, f64)> =
                        self.overrides.iter().map(|(&f, &v)| (f, v)).collect();
                let mut store = self.store.borrow_mut();
                for (field, value) in overrides
                {
                        store.set(self.id, field, value);
                }
        }

        /// Stops the loop, releases every context, clears overrides. The
        /// instance is unusable afterward.
        pub fn destroy(
                self,
                pool: &mut ContextPool,
        )
        {
                for bound in &self.renderers
                {
                        pool.release(&bound.surface);
                }
        }
}

pub type SharedEngine = Rc<RefCell<Engine>>;

#[cfg(test)]
impl Engine
{
        /// Builds an `Engine` with no bound renderers, for exercising the
        /// override/variant bookkeeping without a live `GpuHost`/`ContextPool`
        /// (acquisition itself is exercised by hand, same as `ContextPool`).
        fn new_for_test(
                id: EngineId,
                store: SharedStore,
        ) -> Self
        {
                Self {
                        id,
                        store,
                        renderers: Vec::new(),
                        active: false,
                        tick_count: 0,
                        pending_audio: None,
                        overrides: HashMap::new(),
                }
        }
}

#[cfg(test)]
mod tests
{
        use super::*;
        use crate::params::new_shared_store;

        #[test]
        fn sticky_override_survives_variant_change()
        {
                let store = new_shared_store();
                let mut engine = Engine::new_for_test(EngineId::Holographic, store.clone());

                engine.set_variant(5);
                engine.update_param(ParamField::GridDensity, 42.0);
                engine.set_variant(6);

                assert_eq!(
                        store.borrow().get(EngineId::Holographic, ParamField::GridDensity),
                        42.0
                );
                assert_eq!(
                        store.borrow().get(EngineId::Holographic, ParamField::Variant),
                        6.0
                );
        }

        #[test]
        fn update_param_without_variant_change_is_stable()
        {
                let store = new_shared_store();
                let mut engine = Engine::new_for_test(EngineId::Faceted, store.clone());

                engine.update_param(ParamField::Hue, 77.0);
                assert_eq!(store.borrow().get(EngineId::Faceted, ParamField::Hue), 77.0);
        }

        #[test]
        fn apply_audio_caches_the_latest_frame()
        {
                let store = new_shared_store();
                let mut engine = Engine::new_for_test(EngineId::Quantum, store);

                engine.apply_audio(AudioFeatures {
                        peak: 0.3,
                        ..Default::default()
                });
                engine.apply_audio(AudioFeatures {
                        peak: 0.9,
                        ..Default::default()
                });

                // Newer frames replace older ones rather than queuing
                // (SPEC_FULL.md §4.4); `tick` itself consumes this field but
                // needs a live `GpuHost`, exercised by hand.
                assert_eq!(engine.pending_audio.map(|f| f.peak), Some(0.9));
        }
}
