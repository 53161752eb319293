//! Windowing / Event-Loop Host (C12): the single `winit::window::Window` that
//! backs every off-screen surface and drives the scheduler's per-frame tick
//! (SPEC_FULL.md §4.12). Grounded on the prior `app.rs`
//! `ApplicationHandler` wiring and `engine.rs`'s deferred-GPU-init pattern.

use std::{cell::RefCell, rc::Rc, sync::Arc};

use winit::{
        application::ApplicationHandler,
        event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
        event_loop::ActiveEventLoop,
        keyboard::{KeyCode, PhysicalKey},
        window::{Window, WindowId},
};

use crate::{
        audio::AudioCapture,
        config::HostConfig,
        diagnostics::Diagnostics,
        engine_id::{EngineId, SurfaceRole},
        gpu::{device::GpuHost, pool::ContextPool},
        input::{
                events::{InputEvent, LEFT_BUTTON},
                modes::{ClickMode, PointerMode, WheelMode},
                router::{ReactivityRouter, RouterConfig},
        },
        params::new_shared_store,
        scheduler::EngineScheduler,
        snapshot::DeepLink,
        surfaces::surface_for,
};

/// Everything that only exists once the window (and therefore the GPU
/// device) is alive. Split out from [`App`] the same way the prior design defers
/// `EngineState` until `resumed()`.
struct Runtime
{
        window: Arc<Window>,
        gpu: Rc<RefCell<GpuHost>>,
        scheduler: EngineScheduler,
        router: ReactivityRouter,
        audio: Option<AudioCapture>,
        last_pointer: (f64, f64),
        pointer_buttons: u8,
        diagnostics: Rc<RefCell<Diagnostics>>,
}

pub struct App
{
        config: HostConfig,
        diagnostics: Rc<RefCell<Diagnostics>>,
        deep_link: DeepLink,
        runtime: Option<Runtime>,
}

impl App
{
        pub fn new(
                config: HostConfig,
                diagnostics: Rc<RefCell<Diagnostics>>,
        ) -> Self
        {
                Self::with_deep_link(config, diagnostics, DeepLink::default())
        }

        /// Same as [`App::new`], but applies `deep_link` (SPEC_FULL.md §6, §4.9)
        /// once the initial engine is live — the native equivalent of the
        /// gallery's `?system=...` preview-mode query string, sourced here
        /// from the process's first command-line argument (see
        /// [`crate::run`]).
        pub fn with_deep_link(
                config: HostConfig,
                diagnostics: Rc<RefCell<Diagnostics>>,
                deep_link: DeepLink,
        ) -> Self
        {
                Self {
                        config,
                        diagnostics,
                        deep_link,
                        runtime: None,
                }
        }

        fn viewport(&self) -> (u32, u32)
        {
                self.runtime
                        .as_ref()
                        .map(|r| {
                                let size = r.window.inner_size();
                                (size.width.max(1), size.height.max(1))
                        })
                        .unwrap_or((1, 1))
        }

        /// Composites the active engine's five surfaces into the window's
        /// swapchain image. Real layered shader compositing is out of scope
        /// (SPEC_FULL.md §1 Non-goals / §9); each active surface's texture is
        /// copied over the swapchain image in role order, Content last, so
        /// the seam between Context Pool, Engine Instance, and the window is
        /// exercised without inventing a blend pipeline.
        fn composite(&mut self)
        {
                let Some(runtime) = self.runtime.as_mut()
                else
                {
                        return;
                };

                runtime.scheduler.tick();

                let Some(active) = runtime.scheduler.active_engine()
                else
                {
                        return;
                };

                let gpu = runtime.gpu.borrow();
                let frame = match gpu.surface.get_current_texture()
                {
                        Ok(frame) => frame,
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) =>
                        {
                                return;
                        }
                        Err(err) =>
                        {
                                log::error!("unable to acquire swapchain frame: {err}");
                                return;
                        }
                };

                let mut encoder =
                        gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                                label: Some("composite-encoder"),
                        });

                for role in SurfaceRole::ALL
                {
                        let surface = surface_for(active, role);
                        if let Some(ctx) = runtime.scheduler.pool().context(&surface)
                        {
                                encoder.copy_texture_to_texture(
                                        ctx.texture.as_image_copy(),
                                        frame.texture.as_image_copy(),
                                        ctx.texture.size(),
                                );
                        }
                }

                gpu.queue.submit(Some(encoder.finish()));
                frame.present();
        }

        fn resize(
                &mut self,
                width: u32,
                height: u32,
        )
        {
                let Some(runtime) = self.runtime.as_mut()
                else
                {
                        return;
                };
                runtime.gpu.borrow_mut().resize(width, height);
        }
}

impl ApplicationHandler for App
{
        /// GPU/window resources are created here rather than eagerly:
        /// per winit's portability guidance, some platforms (notably
        /// Android) refuse to create a render surface before the first
        /// `resumed()` callback.
        fn resumed(
                &mut self,
                event_loop: &ActiveEventLoop,
        )
        {
                if self.runtime.is_some()
                {
                        return;
                }

                let window =
                        Arc::new(event_loop.create_window(Window::default_attributes()).unwrap());

                let gpu = match pollster::block_on(GpuHost::new(window.clone()))
                {
                        Ok(gpu) => Rc::new(RefCell::new(gpu)),
                        Err(err) =>
                        {
                                log::error!("failed to initialize GPU host: {err}");
                                event_loop.exit();
                                return;
                        }
                };

                let store = new_shared_store();

                let pool = match ContextPool::new(gpu.clone(), self.config.context_pool.cap)
                {
                        Ok(pool) => pool,
                        Err(err) =>
                        {
                                log::error!("failed to build context pool: {err}");
                                event_loop.exit();
                                return;
                        }
                };

                let mut scheduler = EngineScheduler::new(
                        store.clone(),
                        gpu.clone(),
                        pool,
                        self.config.scheduler.destroy_on_switch,
                        self.diagnostics.clone(),
                );

                let router_config = RouterConfig {
                        master_enabled: self.config.router.master_enabled,
                        pointer_mode: PointerMode::parse(&self.config.router.pointer_mode)
                                .unwrap_or(PointerMode::Rotations),
                        click_mode: ClickMode::parse(&self.config.router.click_mode)
                                .unwrap_or(ClickMode::Burst),
                        wheel_mode: WheelMode::parse(&self.config.router.wheel_mode)
                                .unwrap_or(WheelMode::Cycle),
                };
                let mut router = ReactivityRouter::new(store.clone(), router_config);

                let size = window.inner_size();
                let viewport = (size.width.max(1), size.height.max(1));
                let target = self.deep_link.resolved_engine();
                if scheduler.switch_to(target, viewport).is_err()
                {
                        log::error!("initial switch_to({target:?}) failed, falling back to Faceted");
                        let _ = scheduler.switch_to(EngineId::Faceted, viewport);
                }
                scheduler.reattach_router(&mut router);

                if !self.deep_link.params.is_empty()
                {
                        if let Some(active) = scheduler.active_engine()
                        {
                                let mut store = store.borrow_mut();
                                for &(field, value) in &self.deep_link.params
                                {
                                        store.set(active, field, value);
                                }
                        }
                }

                let audio = if self.config.audio.enabled
                {
                        match AudioCapture::start(&self.config.audio.device)
                        {
                                Ok(capture) => Some(capture),
                                Err(err) =>
                                {
                                        log::warn!("audio capture unavailable: {err}");
                                        None
                                }
                        }
                }
                else
                {
                        None
                };

                self.runtime = Some(Runtime {
                        window,
                        gpu,
                        scheduler,
                        router,
                        audio,
                        last_pointer: (0.5, 0.5),
                        pointer_buttons: 0,
                        diagnostics: self.diagnostics.clone(),
                });
        }

        fn window_event(
                &mut self,
                event_loop: &ActiveEventLoop,
                _window_id: WindowId,
                event: WindowEvent,
        )
        {
                if self.runtime.is_none()
                {
                        return;
                }

                match event
                {
                        WindowEvent::CloseRequested => event_loop.exit(),
                        WindowEvent::Resized(size) => self.resize(size.width, size.height),
                        WindowEvent::RedrawRequested =>
                        {
                                self.drain_audio();
                                let viewport = self.viewport();
                                if let Some(runtime) = self.runtime.as_mut()
                                {
                                        runtime.scheduler.drain_recovery(viewport);
                                        if let Some(active) = runtime.scheduler.active_engine()
                                        {
                                                runtime.router.tick_effects(active);
                                        }
                                }
                                self.composite();
                                if let Some(runtime) = self.runtime.as_ref()
                                {
                                        runtime.window.request_redraw();
                                }
                        }
                        WindowEvent::CursorMoved {
                                position,
                                ..
                        } =>
                        {
                                if let Some(runtime) = self.runtime.as_mut()
                                {
                                        let size = runtime.window.inner_size();
                                        let x = (position.x / size.width.max(1) as f64).clamp(0.0, 1.0);
                                        let y = (position.y / size.height.max(1) as f64).clamp(0.0, 1.0);
                                        runtime.last_pointer = (x, y);
                                        runtime.router.handle_event(InputEvent::Pointer {
                                                x,
                                                y,
                                                buttons: runtime.pointer_buttons,
                                        });
                                }
                        }
                        WindowEvent::MouseInput {
                                state,
                                button: MouseButton::Left,
                                ..
                        } =>
                        {
                                if let Some(runtime) = self.runtime.as_mut()
                                {
                                        match state
                                        {
                                                ElementState::Pressed => runtime.pointer_buttons |= LEFT_BUTTON,
                                                ElementState::Released =>
                                                {
                                                        runtime.pointer_buttons &= !LEFT_BUTTON;
                                                        runtime.router.handle_event(InputEvent::PointerEnd);
                                                }
                                        }
                                }
                        }
                        WindowEvent::MouseWheel {
                                delta,
                                ..
                        } =>
                        {
                                let dy = match delta
                                {
                                        MouseScrollDelta::LineDelta(_, y) => y as f64,
                                        MouseScrollDelta::PixelDelta(pos) => pos.y,
                                };
                                if let Some(runtime) = self.runtime.as_mut()
                                {
                                        runtime.router.handle_event(InputEvent::Wheel {
                                                dy,
                                        });
                                }
                        }
                        WindowEvent::KeyboardInput {
                                event:
                                        KeyEvent {
                                                physical_key: PhysicalKey::Code(code),
                                                state,
                                                ..
                                        },
                                ..
                        } => self.handle_key(event_loop, code, state.is_pressed()),
                        _ =>
                        {}
                }
        }
}

impl App
{
        fn drain_audio(&mut self)
        {
                let Some(runtime) = self.runtime.as_mut()
                else
                {
                        return;
                };

                if let Some(audio) = runtime.audio.as_ref()
                {
                        if let Some(features) = audio.drain_latest()
                        {
                                runtime.router.handle_event(InputEvent::AudioFrame(features));
                                runtime.scheduler.apply_audio(features);
                        }
                }
        }

        /// `1`-`4` switch engines directly, mirroring the deep-link `system`
        /// parameter (SPEC_FULL.md §6); `[`/`]` cycle the active engine's
        /// variant through [`EngineScheduler::set_variant`], the one live
        /// path that exercises the sticky-override rule (SPEC_FULL.md §4.4);
        /// `Escape` exits.
        fn handle_key(
                &mut self,
                event_loop: &ActiveEventLoop,
                code: KeyCode,
                pressed: bool,
        )
        {
                if !pressed
                {
                        return;
                }

                if matches!(code, KeyCode::BracketLeft | KeyCode::BracketRight)
                {
                        self.cycle_variant(if code == KeyCode::BracketRight
                        {
                                1
                        }
                        else
                        {
                                -1
                        });
                        return;
                }

                let target = match code
                {
                        KeyCode::Digit1 => Some(EngineId::Faceted),
                        KeyCode::Digit2 => Some(EngineId::Quantum),
                        KeyCode::Digit3 => Some(EngineId::Holographic),
                        KeyCode::Digit4 => Some(EngineId::Polychora),
                        KeyCode::Escape =>
                        {
                                event_loop.exit();
                                None
                        }
                        _ => None,
                };

                let Some(target) = target
                else
                {
                        return;
                };

                let viewport = self.viewport();
                if let Some(runtime) = self.runtime.as_mut()
                {
                        match runtime.scheduler.switch_to(target, viewport)
                        {
                                Ok(()) => runtime.scheduler.reattach_router(&mut runtime.router),
                                Err(err) =>
                                {
                                        runtime.diagnostics.borrow_mut().emit(
                                                crate::diagnostics::Severity::Error,
                                                "switch_failed",
                                                err.to_string(),
                                        );
                                }
                        }
                }
        }

        /// Advances the active engine's variant by `delta`, wrapping within
        /// `0..variant_count`.
        fn cycle_variant(
                &mut self,
                delta: i32,
        )
        {
                let Some(runtime) = self.runtime.as_mut()
                else
                {
                        return;
                };
                let Some(active) = runtime.scheduler.active_engine()
                else
                {
                        return;
                };

                let count = active.variant_count() as i32;
                let current = runtime.scheduler.current_variant(active);
                let next = (current + delta).rem_euclid(count);
                runtime.scheduler.set_variant(active, next);
        }
}
