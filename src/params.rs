//! The shared, typed, clamped parameter vector (`Params`) and the Parameter
//! Store that mediates reads, writes, and change notifications across
//! engines.

use std::{cell::RefCell, collections::HashMap, f64::consts::PI, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::engine_id::EngineId;

/// One addressable field of [`Params`]. Used by the router, the snapshot
/// codec, and the store's subscription API so callers never juggle string
/// keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamField
{
        Geometry,
        Variant,
        GridDensity,
        MorphFactor,
        Chaos,
        Speed,
        Hue,
        Intensity,
        Saturation,
        Rot4dXw,
        Rot4dYw,
        Rot4dZw,
        Dimension,
}

impl ParamField
{
        pub const ALL: [ParamField; 13] = [
                ParamField::Geometry,
                ParamField::Variant,
                ParamField::GridDensity,
                ParamField::MorphFactor,
                ParamField::Chaos,
                ParamField::Speed,
                ParamField::Hue,
                ParamField::Intensity,
                ParamField::Saturation,
                ParamField::Rot4dXw,
                ParamField::Rot4dYw,
                ParamField::Rot4dZw,
                ParamField::Dimension,
        ];

        pub fn parse(name: &str) -> Option<ParamField>
        {
                match name
                {
                        "geometry" | "geom" => Some(ParamField::Geometry),
                        "variant" => Some(ParamField::Variant),
                        "gridDensity" | "density" => Some(ParamField::GridDensity),
                        "morphFactor" | "morph" => Some(ParamField::MorphFactor),
                        "chaos" => Some(ParamField::Chaos),
                        "speed" => Some(ParamField::Speed),
                        "hue" => Some(ParamField::Hue),
                        "intensity" => Some(ParamField::Intensity),
                        "saturation" => Some(ParamField::Saturation),
                        "rot4dXW" | "rotXW" => Some(ParamField::Rot4dXw),
                        "rot4dYW" | "rotYW" => Some(ParamField::Rot4dYw),
                        "rot4dZW" | "rotZW" => Some(ParamField::Rot4dZw),
                        "dimension" => Some(ParamField::Dimension),
                        _ => None,
                }
        }
}

/// The fixed-shape parameter record. Every field carries its own clamp /
/// normalize rule in [`Params::set_field`] (SPEC_FULL.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Params
{
        pub geometry: i32,
        pub variant: i32,
        pub grid_density: f64,
        pub morph_factor: f64,
        pub chaos: f64,
        pub speed: f64,
        pub hue: f64,
        pub intensity: f64,
        pub saturation: f64,
        pub rot4d_xw: f64,
        pub rot4d_yw: f64,
        pub rot4d_zw: f64,
        pub dimension: f64,
}

fn clamp(value: f64, lo: f64, hi: f64) -> f64
{
        value.max(lo).min(hi)
}

fn normalize_hue(value: f64) -> f64
{
        let wrapped = value % 360.0;
        if wrapped < 0.0
        {
                wrapped + 360.0
        }
        else
        {
                wrapped
        }
}

/// Wraps a rotation into `(-pi, pi]`, matching SPEC_FULL.md §4.1's 4D
/// rotation-normalization rule.
fn normalize_rotation(value: f64) -> f64
{
        let two_pi = 2.0 * PI;
        let mut v = (value + PI) % two_pi;
        if v <= 0.0
        {
                v += two_pi;
        }
        v - PI
}

impl Params
{
        pub fn get_field(&self, field: ParamField) -> f64
        {
                match field
                {
                        ParamField::Geometry => self.geometry as f64,
                        ParamField::Variant => self.variant as f64,
                        ParamField::GridDensity => self.grid_density,
                        ParamField::MorphFactor => self.morph_factor,
                        ParamField::Chaos => self.chaos,
                        ParamField::Speed => self.speed,
                        ParamField::Hue => self.hue,
                        ParamField::Intensity => self.intensity,
                        ParamField::Saturation => self.saturation,
                        ParamField::Rot4dXw => self.rot4d_xw,
                        ParamField::Rot4dYw => self.rot4d_yw,
                        ParamField::Rot4dZw => self.rot4d_zw,
                        ParamField::Dimension => self.dimension,
                }
        }

        /// Clamps/normalizes `value` for `field` and writes it, returning the
        /// value actually stored (post-clamp). `variant_count` bounds the
        /// `Variant` field to `0..variant_count`, snapping to the nearest
        /// endpoint per the §4.1 integer-restore rule; it is ignored for
        /// every other field.
        pub fn set_field(
                &mut self,
                field: ParamField,
                value: f64,
                variant_count: u32,
        ) -> f64
        {
                let stored = match field
                {
                        ParamField::Geometry =>
                        {
                                let wrapped = value.floor().rem_euclid(8.0);
                                self.geometry = wrapped as i32;
                                wrapped
                        }
                        ParamField::Variant =>
                        {
                                let max = (variant_count.max(1) - 1) as i32;
                                self.variant = (value.floor() as i32).clamp(0, max);
                                self.variant as f64
                        }
                        ParamField::GridDensity =>
                        {
                                self.grid_density = clamp(value, 5.0, 100.0);
                                self.grid_density
                        }
                        ParamField::MorphFactor =>
                        {
                                self.morph_factor = clamp(value, 0.0, 2.0);
                                self.morph_factor
                        }
                        ParamField::Chaos =>
                        {
                                self.chaos = clamp(value, 0.0, 1.0);
                                self.chaos
                        }
                        ParamField::Speed =>
                        {
                                self.speed = clamp(value, 0.1, 3.0);
                                self.speed
                        }
                        ParamField::Hue =>
                        {
                                self.hue = normalize_hue(value);
                                self.hue
                        }
                        ParamField::Intensity =>
                        {
                                self.intensity = clamp(value, 0.0, 1.0);
                                self.intensity
                        }
                        ParamField::Saturation =>
                        {
                                self.saturation = clamp(value, 0.0, 1.0);
                                self.saturation
                        }
                        ParamField::Rot4dXw =>
                        {
                                self.rot4d_xw = normalize_rotation(value);
                                self.rot4d_xw
                        }
                        ParamField::Rot4dYw =>
                        {
                                self.rot4d_yw = normalize_rotation(value);
                                self.rot4d_yw
                        }
                        ParamField::Rot4dZw =>
                        {
                                self.rot4d_zw = normalize_rotation(value);
                                self.rot4d_zw
                        }
                        ParamField::Dimension =>
                        {
                                self.dimension = clamp(value, 3.0, 4.5);
                                self.dimension
                        }
                };
                stored
        }
}

/// Outcome of a single [`ParameterStore::set`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChangeOutcome
{
        Unchanged,
        Changed
        {
                old: f64, new: f64
        },
}

type Subscriber = Box<dyn FnMut(EngineId, ParamField, f64)>;

/// Subscription handle returned by [`ParameterStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(usize);

/// Single source of truth for every engine's parameter vector.
///
/// Modeled on the prior `InputManager` subscriber-callback pattern
/// (`crates/oxide/src/input/manager.rs`): a slot-indexed `Vec<Option<Box<dyn
/// FnMut>>>` rather than a `HashMap`, so unsubscribe is O(1) and handles stay
/// valid across inserts.
pub struct ParameterStore
{
        params: HashMap<EngineId, Params>,
        subscribers: Vec<Option<Subscriber>>,
}

impl std::fmt::Debug for ParameterStore
{
        fn fmt(
                &self,
                f: &mut std::fmt::Formatter<'_>,
        ) -> std::fmt::Result
        {
                f.debug_struct("ParameterStore")
                        .field("params", &self.params)
                        .field("subscriber_slots", &self.subscribers.len())
                        .finish()
        }
}

impl ParameterStore
{
        pub fn new() -> Self
        {
                let params = EngineId::ALL.iter().map(|&id| (id, id.default_params())).collect();
                Self {
                        params,
                        subscribers: Vec::new(),
                }
        }

        pub fn get(
                &self,
                engine: EngineId,
                field: ParamField,
        ) -> f64
        {
                self.params[&engine].get_field(field)
        }

        pub fn set(
                &mut self,
                engine: EngineId,
                field: ParamField,
                value: f64,
        ) -> ChangeOutcome
        {
                let old = self.get(engine, field);
                let new = self
                        .params
                        .get_mut(&engine)
                        .unwrap()
                        .set_field(field, value, engine.variant_count());

                if (new - old).abs() <= f64::EPSILON
                {
                        return ChangeOutcome::Unchanged;
                }

                self.notify(engine, field, new);
                ChangeOutcome::Changed {
                        old,
                        new,
                }
        }

        /// Applies every `(field, value)` pair atomically, emitting one
        /// notification per field that actually changed, and returns the set
        /// of changed fields.
        pub fn batch_set(
                &mut self,
                engine: EngineId,
                updates: &[(ParamField, f64)],
        ) -> Vec<ParamField>
        {
                let mut changed = Vec::new();
                for &(field, value) in updates
                {
                        if let ChangeOutcome::Changed {
                                ..
                        } = self.set(engine, field, value)
                        {
                                changed.push(field);
                        }
                }
                changed
        }

        pub fn snapshot(
                &self,
                engine: EngineId,
        ) -> Params
        {
                self.params[&engine]
        }

        pub fn restore(
                &mut self,
                engine: EngineId,
                params: Params,
        )
        {
                for field in ParamField::ALL
                {
                        self.set(engine, field, params.get_field(field));
                }
        }

        pub fn subscribe(
                &mut self,
                callback: impl FnMut(EngineId, ParamField, f64) + 'static,
        ) -> SubscriptionId
        {
                self.subscribers.push(Some(Box::new(callback)));
                SubscriptionId(self.subscribers.len() - 1)
        }

        pub fn unsubscribe(
                &mut self,
                handle: SubscriptionId,
        )
        {
                if let Some(slot) = self.subscribers.get_mut(handle.0)
                {
                        *slot = None;
                }
        }

        fn notify(
                &mut self,
                engine: EngineId,
                field: ParamField,
                value: f64,
        )
        {
                for slot in self.subscribers.iter_mut()
                {
                        if let Some(cb) = slot
                        {
                                cb(engine, field, value);
                        }
                }
        }
}

impl Default for ParameterStore
{
        fn default() -> Self
        {
                Self::new()
        }
}

/// Shared handle used across the scheduler, router, and engine instances, in
/// place of an `Arc<Mutex<_>>` — the host runs single-threaded
/// (SPEC_FULL.md §5), so `Rc<RefCell<_>>` is the correct-weight primitive.
pub type SharedStore = Rc<RefCell<ParameterStore>>;

pub fn new_shared_store() -> SharedStore
{
        Rc::new(RefCell::new(ParameterStore::new()))
}

#[cfg(test)]
mod tests
{
        use super::*;

        #[test]
        fn hue_wraps_modulo_360()
        {
                let mut store = ParameterStore::new();
                store.set(EngineId::Faceted, ParamField::Hue, 400.0);
                assert_eq!(store.get(EngineId::Faceted, ParamField::Hue), 40.0);

                store.set(EngineId::Faceted, ParamField::Hue, -10.0);
                assert_eq!(store.get(EngineId::Faceted, ParamField::Hue), 350.0);
        }

        #[test]
        fn rotation_wraps_match_across_full_turn()
        {
                let mut store = ParameterStore::new();
                store.set(EngineId::Faceted, ParamField::Rot4dXw, 1.0);
                let base = store.get(EngineId::Faceted, ParamField::Rot4dXw);

                store.set(EngineId::Faceted, ParamField::Rot4dXw, 1.0 + 2.0 * PI);
                let wrapped = store.get(EngineId::Faceted, ParamField::Rot4dXw);

                assert!((base - wrapped).abs() < 1e-9);
        }

        #[test]
        fn set_clamps_numeric_fields_into_range()
        {
                let mut store = ParameterStore::new();
                store.set(EngineId::Quantum, ParamField::Chaos, 5.0);
                assert_eq!(store.get(EngineId::Quantum, ParamField::Chaos), 1.0);

                store.set(EngineId::Quantum, ParamField::Chaos, -5.0);
                assert_eq!(store.get(EngineId::Quantum, ParamField::Chaos), 0.0);
        }

        #[test]
        fn variant_snaps_to_nearest_engine_bound()
        {
                let mut store = ParameterStore::new();

                store.set(EngineId::Faceted, ParamField::Variant, -5.0);
                assert_eq!(store.get(EngineId::Faceted, ParamField::Variant), 0.0);

                store.set(EngineId::Faceted, ParamField::Variant, 999.0);
                assert_eq!(
                        store.get(EngineId::Faceted, ParamField::Variant),
                        (EngineId::Faceted.variant_count() - 1) as f64
                );

                store.set(EngineId::Holographic, ParamField::Variant, 999.0);
                assert_eq!(
                        store.get(EngineId::Holographic, ParamField::Variant),
                        (EngineId::Holographic.variant_count() - 1) as f64
                );
        }

        #[test]
        fn unchanged_write_reports_unchanged()
        {
                let mut store = ParameterStore::new();
                let current = store.get(EngineId::Faceted, ParamField::Speed);
                let outcome = store.set(EngineId::Faceted, ParamField::Speed, current);
                assert_eq!(outcome, ChangeOutcome::Unchanged);
        }

        #[test]
        fn restore_round_trips_snapshot()
        {
                let mut store = ParameterStore::new();
                store.set(EngineId::Holographic, ParamField::Hue, 123.0);
                let snap = store.snapshot(EngineId::Holographic);

                store.set(EngineId::Holographic, ParamField::Hue, 10.0);
                store.restore(EngineId::Holographic, snap);

                assert_eq!(store.snapshot(EngineId::Holographic), snap);
        }

        #[test]
        fn subscriber_receives_change_notifications()
        {
                let mut store = ParameterStore::new();
                let seen = Rc::new(RefCell::new(Vec::new()));
                let seen_clone = seen.clone();

                store.subscribe(move |engine, field, value| {
                        seen_clone.borrow_mut().push((engine, field, value));
                });

                store.set(EngineId::Polychora, ParamField::Speed, 2.0);

                assert_eq!(seen.borrow().len(), 1);
                assert_eq!(seen.borrow()[0].0, EngineId::Polychora);
        }

        #[test]
        fn unsubscribe_stops_future_notifications()
        {
                let mut store = ParameterStore::new();
                let count = Rc::new(RefCell::new(0));
                let count_clone = count.clone();

                let handle = store.subscribe(move |_, _, _| {
                        *count_clone.borrow_mut() += 1;
                });

                store.set(EngineId::Faceted, ParamField::Speed, 2.0);
                store.unsubscribe(handle);
                store.set(EngineId::Faceted, ParamField::Speed, 1.5);

                assert_eq!(*count.borrow(), 1);
        }
}
