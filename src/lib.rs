pub mod app;
pub mod audio;
pub mod config;
pub mod diagnostics;
pub mod engine_id;
pub mod engine_instance;
pub mod error;
pub mod gpu;
pub mod input;
pub mod params;
pub mod scheduler;
pub mod snapshot;
pub mod surfaces;
pub mod utils;

use std::{cell::RefCell, rc::Rc};

use winit::event_loop::EventLoop;

use crate::{app::App, diagnostics::Diagnostics, snapshot::DeepLink};

/// Boots logging, loads configuration, and runs the event loop until the
/// window is closed (SPEC_FULL.md §4.10, §4.12).
///
/// The process's first command-line argument, if present, is parsed as a
/// `?system=...` deep-link query (SPEC_FULL.md §6) — the native stand-in for
/// the gallery page's URL preview-mode parameters.
pub fn run() -> anyhow::Result<()>
{
        let diagnostics = Rc::new(RefCell::new(Diagnostics::new()));

        let config = utils::bootstrap::load_config(&mut diagnostics.borrow_mut());

        utils::bootstrap::config_logging(&config.logging.level);
        utils::bootstrap::show_start_message();

        let deep_link =
                std::env::args().nth(1).map(|q| DeepLink::parse(&q)).unwrap_or_default();

        let event_loop = EventLoop::new()?;
        let mut app = App::with_deep_link(config, diagnostics, deep_link);

        event_loop.run_app(&mut app)?;

        log::info!("{}", utils::exit::get_exit_message());

        Ok(())
}
