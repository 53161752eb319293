//! Closed set of visualizer systems and their static metadata.

use crate::params::Params;

/// One of the four hosted visualizer systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EngineId
{
        Faceted,
        Quantum,
        Holographic,
        Polychora,
}

impl EngineId
{
        pub const ALL: [EngineId; 4] =
                [EngineId::Faceted, EngineId::Quantum, EngineId::Holographic, EngineId::Polychora];

        pub fn metadata(self) -> &'static EngineMetadata
        {
                match self
                {
                        EngineId::Faceted => &FACETED,
                        EngineId::Quantum => &QUANTUM,
                        EngineId::Holographic => &HOLOGRAPHIC,
                        EngineId::Polychora => &POLYCHORA,
                }
        }

        pub fn name(self) -> &'static str
        {
                self.metadata().name
        }

        /// Surface id prefix as used by the legacy `[prefix]-[role]-canvas`
        /// identifier scheme (SPEC_FULL.md §6). Faceted carries no prefix.
        pub fn surface_prefix(self) -> &'static str
        {
                self.metadata().surface_prefix
        }

        pub fn has_native_reactivity(self) -> bool
        {
                self.metadata().has_native_reactivity
        }

        pub fn variant_count(self) -> u32
        {
                self.metadata().variant_count
        }

        pub fn hue_offset(self) -> f64
        {
                self.metadata().hue_offset
        }

        pub fn default_params(self) -> Params
        {
                (self.metadata().default_params)()
        }

        pub fn parse(name: &str) -> Option<EngineId>
        {
                match name
                {
                        "faceted" => Some(EngineId::Faceted),
                        "quantum" => Some(EngineId::Quantum),
                        "holographic" => Some(EngineId::Holographic),
                        "polychora" => Some(EngineId::Polychora),
                        _ => None,
                }
        }
}

pub struct EngineMetadata
{
        pub name: &'static str,
        pub surface_prefix: &'static str,
        pub has_native_reactivity: bool,
        pub variant_count: u32,
        /// Hue offset resolved as an Open Question in SPEC_FULL.md §9: picked
        /// so each engine's default is distinct and Quantum/Distance-mode
        /// scenario numbers from SPEC_FULL.md §8 stay literal.
        pub hue_offset: f64,
        pub default_params: fn() -> Params,
}

static FACETED: EngineMetadata = EngineMetadata {
        name: "Faceted",
        surface_prefix: "",
        has_native_reactivity: false,
        variant_count: 8,
        hue_offset: 200.0,
        default_params: || Params {
                geometry: 0,
                variant: 0,
                grid_density: 20.0,
                morph_factor: 1.0,
                chaos: 0.2,
                speed: 1.0,
                hue: 200.0,
                intensity: 0.6,
                saturation: 0.8,
                rot4d_xw: 0.0,
                rot4d_yw: 0.0,
                rot4d_zw: 0.0,
                dimension: 3.0,
        },
};

static QUANTUM: EngineMetadata = EngineMetadata {
        name: "Quantum",
        surface_prefix: "quantum",
        has_native_reactivity: true,
        variant_count: 8,
        hue_offset: 280.0,
        default_params: || Params {
                geometry: 0,
                variant: 0,
                grid_density: 20.0,
                morph_factor: 1.0,
                chaos: 0.2,
                speed: 1.0,
                hue: 280.0,
                intensity: 0.7,
                saturation: 0.9,
                rot4d_xw: 0.0,
                rot4d_yw: 0.0,
                rot4d_zw: 0.0,
                dimension: 3.5,
        },
};

static HOLOGRAPHIC: EngineMetadata = EngineMetadata {
        name: "Holographic",
        surface_prefix: "holo",
        has_native_reactivity: true,
        variant_count: 30,
        hue_offset: 320.0,
        default_params: || Params {
                geometry: 0,
                variant: 0,
                grid_density: 30.0,
                morph_factor: 1.0,
                chaos: 0.3,
                speed: 1.0,
                hue: 320.0,
                intensity: 0.6,
                saturation: 0.85,
                rot4d_xw: 0.0,
                rot4d_yw: 0.0,
                rot4d_zw: 0.0,
                dimension: 3.5,
        },
};

static POLYCHORA: EngineMetadata = EngineMetadata {
        name: "Polychora",
        surface_prefix: "polychora",
        has_native_reactivity: false,
        variant_count: 8,
        hue_offset: 260.0,
        default_params: || Params {
                geometry: 0,
                variant: 0,
                grid_density: 20.0,
                morph_factor: 1.0,
                chaos: 0.2,
                speed: 1.0,
                hue: 260.0,
                intensity: 0.6,
                saturation: 0.8,
                rot4d_xw: 0.0,
                rot4d_yw: 0.0,
                rot4d_zw: 0.0,
                dimension: 4.0,
        },
};

/// The fixed five roles every engine composites one surface for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceRole
{
        Background,
        Shadow,
        Content,
        Highlight,
        Accent,
}

impl SurfaceRole
{
        pub const ALL: [SurfaceRole; 5] = [
                SurfaceRole::Background,
                SurfaceRole::Shadow,
                SurfaceRole::Content,
                SurfaceRole::Highlight,
                SurfaceRole::Accent,
        ];

        pub fn name(self) -> &'static str
        {
                match self
                {
                        SurfaceRole::Background => "background",
                        SurfaceRole::Shadow => "shadow",
                        SurfaceRole::Content => "content",
                        SurfaceRole::Highlight => "highlight",
                        SurfaceRole::Accent => "accent",
                }
        }
}

#[cfg(test)]
mod tests
{
        use super::*;

        #[test]
        fn parse_round_trips_known_names()
        {
                for id in EngineId::ALL
                {
                        let lower = id.name().to_lowercase();
                        assert_eq!(EngineId::parse(&lower), Some(id));
                }
        }

        #[test]
        fn parse_rejects_unknown_names()
        {
                assert_eq!(EngineId::parse("doesnotexist"), None);
        }

        #[test]
        fn hue_offsets_are_distinct()
        {
                let mut hues: Vec<_> = EngineId::ALL.iter().map(|e| e.hue_offset() as i64).collect();
                hues.sort();
                hues.dedup();
                assert_eq!(hues.len(), EngineId::ALL.len());
        }
}
