//! Enforces the global cap on live GPU contexts (SPEC_FULL.md §4.3).

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{error::HostError, gpu::device::GpuHost, surfaces::Surface};

pub const HARD_CEILING: usize = 16;
pub const DEFAULT_LIVE_BUDGET: usize = 5;

fn validate_cap(cap: usize) -> Result<(), HostError>
{
        if cap == 0 || cap > HARD_CEILING
        {
                return Err(HostError::InvalidConfig {
                        field: "context_pool.cap",
                        reason: format!("cap {cap} outside 1..={HARD_CEILING}"),
                });
        }
        Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtxState
{
        Bound,
        Lost,
}

pub struct Ctx
{
        pub surface: Surface,
        pub state: CtxState,
        pub texture: wgpu::Texture,
        pub view: wgpu::TextureView,
}

impl std::fmt::Debug for Ctx
{
        fn fmt(
                &self,
                f: &mut std::fmt::Formatter<'_>,
        ) -> std::fmt::Result
        {
                f.debug_struct("Ctx")
                        .field("surface", &self.surface.id)
                        .field("state", &self.state)
                        .finish()
        }
}

/// Mediates acquisition/release of GPU contexts against a shared
/// [`GpuHost`], keeping live-context count at or under `cap`.
pub struct ContextPool
{
        gpu: Rc<RefCell<GpuHost>>,
        cap: usize,
        contexts: HashMap<String, Ctx>,
        loss_handlers: Vec<Box<dyn FnMut(&Surface)>>,
        pending_loss: Vec<Surface>,
}

impl std::fmt::Debug for ContextPool
{
        fn fmt(
                &self,
                f: &mut std::fmt::Formatter<'_>,
        ) -> std::fmt::Result
        {
                f.debug_struct("ContextPool")
                        .field("cap", &self.cap)
                        .field("live", &self.contexts.len())
                        .finish()
        }
}

impl ContextPool
{
        /// `cap` must be `1..=16`; anything else fails at construction rather
        /// than silently clamping (SPEC_FULL.md §4.3, §9 open question).
        pub fn new(
                gpu: Rc<RefCell<GpuHost>>,
                cap: usize,
        ) -> Result<Self, HostError>
        {
                validate_cap(cap)?;

                Ok(Self {
                        gpu,
                        cap,
                        contexts: HashMap::new(),
                        loss_handlers: Vec::new(),
                        pending_loss: Vec::new(),
                })
        }

        pub fn cap(&self) -> usize
        {
                self.cap
        }

        pub fn live_count(&self) -> usize
        {
                self.contexts.len()
        }

        pub fn is_bound(
                &self,
                surface: &Surface,
        ) -> bool
        {
                matches!(self.contexts.get(&surface.id), Some(c) if c.state == CtxState::Bound)
        }

        /// Acquires a context for `surface` at `(width, height)`. Step order
        /// follows SPEC_FULL.md §4.3's `acquire` algorithm.
        pub fn acquire(
                &mut self,
                surface: &Surface,
                width: u32,
                height: u32,
        ) -> Result<(), HostError>
        {
                if self.contexts.contains_key(&surface.id)
                {
                        return Ok(());
                }

                if self.contexts.len() >= self.cap
                {
                        return Err(HostError::CapacityExceeded {
                                engine: surface.engine,
                                cap: self.cap,
                        });
                }

                let gpu = self.gpu.borrow();
                let (texture, view) = gpu.create_render_target(&surface.id, width, height)?;

                self.contexts.insert(surface.id.clone(), Ctx {
                        surface: surface.clone(),
                        state: CtxState::Bound,
                        texture,
                        view,
                });

                Ok(())
        }

        pub fn release(
                &mut self,
                surface: &Surface,
        )
        {
                self.contexts.remove(&surface.id);
        }

        /// Frees every context not belonging to `keep`. Used by the scheduler's
        /// forced-cleanup retry on `CapacityExceeded` (SPEC_FULL.md §4.5).
        pub fn release_all_except(
                &mut self,
                keep: &[Surface],
        )
        {
                let keep_ids: std::collections::HashSet<&str> =
                        keep.iter().map(|s| s.id.as_str()).collect();
                self.contexts.retain(|id, _| keep_ids.contains(id.as_str()));
        }

        pub fn validate(
                &self,
                surface: &Surface,
        ) -> Result<(), HostError>
        {
                match self.contexts.get(&surface.id)
                {
                        Some(ctx) if ctx.state == CtxState::Bound => Ok(()),
                        Some(_) => Err(HostError::ContextLost {
                                surface: surface.id.clone(),
                        }),
                        None => Err(HostError::SurfaceNotReady {
                                surface: surface.id.clone(),
                        }),
                }
        }

        pub fn context(
                &self,
                surface: &Surface,
        ) -> Option<&Ctx>
        {
                self.contexts.get(&surface.id)
        }

        /// Marks `surface`'s context lost; recovery is handled by the
        /// scheduler on the next tick, never inline from a driver callback
        /// (SPEC_FULL.md §5).
        pub fn mark_lost(
                &mut self,
                surface: &Surface,
        )
        {
                if let Some(ctx) = self.contexts.get_mut(&surface.id)
                {
                        ctx.state = CtxState::Lost;
                        self.pending_loss.push(surface.clone());
                }
        }

        pub fn on_loss(
                &mut self,
                handler: impl FnMut(&Surface) + 'static,
        )
        {
                self.loss_handlers.push(Box::new(handler));
        }

        /// Drains queued loss notifications, running every registered
        /// handler. Called once at the top of the scheduler's tick.
        pub fn drain_loss_events(&mut self)
        {
                let pending = std::mem::take(&mut self.pending_loss);
                for surface in pending
                {
                        for handler in self.loss_handlers.iter_mut()
                        {
                                handler(&surface);
                        }
                }
        }
}

// Acquisition/release against real GPU resources needs a live adapter and is
// exercised by hand, not in unit tests, same as the original `EngineState`;
// `validate_cap` is the one piece of `ContextPool` logic that is pure.
#[cfg(test)]
mod tests
{
        use super::*;

        #[test]
        fn cap_zero_is_rejected()
        {
                assert!(validate_cap(0).is_err());
        }

        #[test]
        fn cap_above_hard_ceiling_is_rejected()
        {
                assert!(validate_cap(HARD_CEILING + 1).is_err());
        }

        #[test]
        fn cap_within_range_is_accepted()
        {
                assert!(validate_cap(1).is_ok());
                assert!(validate_cap(HARD_CEILING).is_ok());
                assert!(validate_cap(DEFAULT_LIVE_BUDGET).is_ok());
        }
}
