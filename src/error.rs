//! Typed error taxonomy for the visualization host.
//!
//! Every fail-kind here is local to one component; the scheduler and context
//! pool additionally mirror these to the [`crate::diagnostics::Diagnostics`]
//! sink so a host integrator has one place to observe failures instead of
//! matching on every call site.

use crate::engine_id::EngineId;

#[derive(Debug, thiserror::Error)]
pub enum HostError
{
        #[error("invalid value for parameter {field:?}: {reason}")]
        InvalidValue
        {
                field: crate::params::ParamField,
                reason: String,
        },

        #[error("context cap ({cap}) exceeded acquiring surfaces for {engine:?}")]
        CapacityExceeded
        {
                engine: EngineId,
                cap: usize,
        },

        #[error("surface {surface} not ready for context acquisition")]
        SurfaceNotReady
        {
                surface: String,
        },

        #[error("GPU context creation failed for surface {surface}: {reason}")]
        ContextCreationFailed
        {
                surface: String,
                reason: String,
        },

        #[error("GPU context lost for surface {surface}")]
        ContextLost
        {
                surface: String,
        },

        #[error("engine {engine:?} failed to build: {reason}")]
        CreateFailed
        {
                engine: EngineId,
                reason: String,
        },

        #[error("switch to {target:?} failed: {reason}")]
        SwitchFailed
        {
                target: EngineId,
                reason: String,
        },

        #[error("permission denied for {channel}")]
        PermissionDenied
        {
                channel: &'static str,
        },

        #[error("invalid configuration for {field}: {reason}, falling back to default")]
        InvalidConfig
        {
                field: &'static str,
                reason: String,
        },
}

pub type HostResult<T> = Result<T, HostError>;
