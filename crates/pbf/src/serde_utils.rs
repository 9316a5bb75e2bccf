//! Serde helpers for glam types.

/// `Vec2` as a two-element `[x, y]` array. Use with `#[serde(with = "...")]`.
pub mod vec2 {
    use glam::Vec2;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &Vec2, s: S) -> Result<S::Ok, S::Error> {
        v.to_array().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec2, D::Error> {
        <[f32; 2]>::deserialize(d).map(Vec2::from_array)
    }
}
