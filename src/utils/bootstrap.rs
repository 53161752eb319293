use crate::{config::HostConfig, diagnostics::Diagnostics};

pub fn show_start_message()
{
        let banner = r#"

 ____   ____.__                   .__  .__                     __
 \   \ /   /|__| ________ _______  |  | |__|_______ ___________/  |_
  \   Y   / |  |/  ___/  |  \__  \ |  | |  \___   // __ \_  __ \   __\
   \     /  |  |\___ \|  |  // __ \|  |_|  |/    /\  ___/|  | \/|  |
    \___/   |__/____  >____/(____  /____/__/_____ \\___  >__|   |__|
                     \/           \/              \/    \/
     Multi-engine visualization host built with wgpu and winit.

            "#;

        log::info!("{banner}");
}

pub fn config_logging(level: &str)
{
        if std::env::var_os("RUST_LOG").is_none()
        {
                // SAFETY: called once, before any other thread is spawned,
                // from `run()` prior to constructing the event loop.
                unsafe {
                        std::env::set_var("RUST_LOG", level);
                }
        }

        env_logger::init();

        log::info!("logging configured at level {level}");
}

/// Loads [`HostConfig`] from `visualizer-host.toml` next to the binary,
/// falling back to defaults and reporting any issue through `diagnostics`
/// (SPEC_FULL.md §4.11).
pub fn load_config(diagnostics: &mut Diagnostics) -> HostConfig
{
        let path = std::path::Path::new("visualizer-host.toml");
        HostConfig::load(path, diagnostics)
}
