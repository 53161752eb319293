pub mod device;
pub mod pool;

pub use device::{GpuHost, LayerRenderer, SolidFieldRenderer};
pub use pool::{Ctx, CtxState, ContextPool};
