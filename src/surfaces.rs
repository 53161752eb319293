//! The fixed, process-wide table of layered drawing surfaces: 5 roles x 4
//! engines, build-time data with no runtime mutation (SPEC_FULL.md §4.2).

use crate::engine_id::{EngineId, SurfaceRole};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Surface
{
        pub engine: EngineId,
        pub role: SurfaceRole,
        pub id: String,
}

impl Surface
{
        fn new(
                engine: EngineId,
                role: SurfaceRole,
        ) -> Self
        {
                let prefix = engine.surface_prefix();
                let id = if prefix.is_empty()
                {
                        format!("{}-canvas", role.name())
                }
                else
                {
                        format!("{}-{}-canvas", prefix, role.name())
                };

                Self {
                        engine,
                        role,
                        id,
                }
        }
}

/// Returns the five [`Surface`] descriptors owned by `engine`, in role order.
pub fn surfaces_for(engine: EngineId) -> [Surface; 5]
{
        let mut roles = SurfaceRole::ALL.into_iter();
        std::array::from_fn(|_| Surface::new(engine, roles.next().unwrap()))
}

/// Looks up the single surface for `engine`/`role`. Total: every engine
/// declares exactly one surface per role.
pub fn surface_for(
        engine: EngineId,
        role: SurfaceRole,
) -> Surface
{
        Surface::new(engine, role)
}

#[cfg(test)]
mod tests
{
        use super::*;

        #[test]
        fn faceted_surfaces_carry_no_prefix()
        {
                let surfaces = surfaces_for(EngineId::Faceted);
                assert_eq!(surfaces[0].id, "background-canvas");
                assert_eq!(surfaces[2].id, "content-canvas");
        }

        #[test]
        fn quantum_surfaces_carry_prefix()
        {
                let surfaces = surfaces_for(EngineId::Quantum);
                assert_eq!(surfaces[3].id, "quantum-highlight-canvas");
        }

        #[test]
        fn every_engine_declares_five_distinct_surfaces()
        {
                for id in EngineId::ALL
                {
                        let surfaces = surfaces_for(id);
                        let mut ids: Vec<_> = surfaces.iter().map(|s| s.id.clone()).collect();
                        ids.sort();
                        ids.dedup();
                        assert_eq!(ids.len(), 5);
                }
        }
}
