//! Snapshot & Deep-Link (C9): JSON schema (de)serialization and `?system=`
//! deep-link application (SPEC_FULL.md §4.9, §6).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
        engine_id::EngineId,
        params::{ParamField, Params},
};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError
{
        #[error("malformed snapshot json: {0}")]
        Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot
{
        pub system: String,
        pub parameters: Value,
        #[serde(rename = "geometryName")]
        pub geometry_name: String,
        pub created: String,
}

impl EngineSnapshot
{
        pub fn from_params(
                id: EngineId,
                params: &Params,
                geometry_name: &str,
        ) -> Self
        {
                let parameters = serde_json::json!({
                        "geometry": params.geometry,
                        "variant": params.variant,
                        "gridDensity": params.grid_density,
                        "morphFactor": params.morph_factor,
                        "chaos": params.chaos,
                        "speed": params.speed,
                        "hue": params.hue,
                        "intensity": params.intensity,
                        "saturation": params.saturation,
                        "rot4dXW": params.rot4d_xw,
                        "rot4dYW": params.rot4d_yw,
                        "rot4dZW": params.rot4d_zw,
                        "dimension": params.dimension,
                });

                Self {
                        system: id.name().to_lowercase(),
                        parameters,
                        geometry_name: geometry_name.to_string(),
                        created: Utc::now().to_rfc3339(),
                }
        }

        pub fn to_json(&self) -> Result<String, SnapshotError>
        {
                Ok(serde_json::to_string(self)?)
        }

        pub fn from_json(text: &str) -> Result<Self, SnapshotError>
        {
                Ok(serde_json::from_str(text)?)
        }

        /// Applies legacy field aliases, ignores unknown fields, and falls
        /// back to `defaults` for any missing/invalid value — never panics
        /// on malformed input (SPEC_FULL.md §4.9). `engine` bounds the
        /// `variant` field to that engine's variant count.
        pub fn into_params(
                &self,
                engine: EngineId,
                defaults: Params,
        ) -> Params
        {
                let mut params = defaults;

                let Value::Object(map) = &self.parameters
                else
                {
                        return params;
                };

                for (key, value) in map
                {
                        let Some(field) = ParamField::parse(key)
                        else
                        {
                                continue;
                        };
                        let Some(number) = value.as_f64()
                        else
                        {
                                continue;
                        };
                        params.set_field(field, number, engine.variant_count());
                }

                params
        }
}

/// `?system=<EngineId>&<param>=<number>&...&hideui=(true|false)`.
#[derive(Debug, Clone, Default)]
pub struct DeepLink
{
        pub system: Option<EngineId>,
        pub params: Vec<(ParamField, f64)>,
        pub hide_ui: bool,
}

impl DeepLink
{
        pub fn parse(query: &str) -> Self
        {
                let query = query.trim_start_matches('?');
                let mut link = DeepLink::default();

                for pair in query.split('&').filter(|p| !p.is_empty())
                {
                        let mut parts = pair.splitn(2, '=');
                        let (Some(key), Some(value)) = (parts.next(), parts.next())
                        else
                        {
                                continue;
                        };

                        match key
                        {
                                "system" => link.system = EngineId::parse(value),
                                "hideui" => link.hide_ui = value == "true",
                                other =>
                                {
                                        if let (Some(field), Ok(number)) =
                                                (ParamField::parse(other), value.parse::<f64>())
                                        {
                                                link.params.push((field, number));
                                        }
                                }
                        }
                }

                link
        }

        /// Resolves the engine to switch to, falling back to `Faceted` when
        /// the requested system name is missing or unknown (SPEC_FULL.md §6,
        /// §8 scenario 8).
        pub fn resolved_engine(&self) -> EngineId
        {
                self.system.unwrap_or(EngineId::Faceted)
        }
}

#[cfg(test)]
mod tests
{
        use super::*;

        #[test]
        fn round_trips_through_json()
        {
                let params = EngineId::Quantum.default_params();
                let snapshot = EngineSnapshot::from_params(EngineId::Quantum, &params, "hypercube");
                let json = snapshot.to_json().unwrap();
                let decoded = EngineSnapshot::from_json(&json).unwrap();
                let restored = decoded.into_params(EngineId::Quantum, EngineId::Quantum.default_params());
                assert_eq!(restored, params);
        }

        #[test]
        fn legacy_aliases_decode_to_modern_fields()
        {
                let json = r#"{
                        "system": "faceted",
                        "parameters": { "density": 42.0, "morph": 1.5, "geom": 3, "rotXW": 1.0 },
                        "geometryName": "cube",
                        "created": "2024-01-01T00:00:00Z"
                }"#;
                let snapshot = EngineSnapshot::from_json(json).unwrap();
                let params = snapshot.into_params(EngineId::Faceted, EngineId::Faceted.default_params());
                assert_eq!(params.grid_density, 42.0);
                assert_eq!(params.morph_factor, 1.5);
                assert_eq!(params.geometry, 3);
                assert!((params.rot4d_xw - 1.0).abs() < 1e-9);
        }

        #[test]
        fn unknown_fields_are_ignored()
        {
                let json = r#"{
                        "system": "faceted",
                        "parameters": { "hue": 10.0, "totallyUnknownField": 999 },
                        "geometryName": "cube",
                        "created": "2024-01-01T00:00:00Z"
                }"#;
                let snapshot = EngineSnapshot::from_json(json).unwrap();
                let params = snapshot.into_params(EngineId::Faceted, EngineId::Faceted.default_params());
                assert_eq!(params.hue, 10.0);
        }

        #[test]
        fn deep_link_falls_back_to_faceted_on_unknown_system()
        {
                let link = DeepLink::parse("?system=doesnotexist&hue=45");
                assert_eq!(link.resolved_engine(), EngineId::Faceted);
                assert_eq!(link.params, vec![(ParamField::Hue, 45.0)]);
        }

        #[test]
        fn deep_link_parses_hide_ui_flag()
        {
                let link = DeepLink::parse("?system=quantum&hideui=true");
                assert_eq!(link.resolved_engine(), EngineId::Quantum);
                assert!(link.hide_ui);
        }
}
