use quartz_nbt::{NbtCompound, NbtList, NbtTag};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Owned, serde-friendly mirror of an NBT tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NbtValue {
    String(String),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Byte(i8),
    Short(i16),
    Boolean(bool),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    ByteArray(Vec<i8>),
    List(Vec<NbtValue>),
    Compound(HashMap<String, NbtValue>),
}

impl NbtValue {
    pub fn from_tag(tag: &NbtTag) -> NbtValue {
        match tag {
            NbtTag::String(s) => NbtValue::String(s.clone()),
            NbtTag::Int(i) => NbtValue::Int(*i),
            NbtTag::Long(l) => NbtValue::Long(*l),
            NbtTag::Float(f) => NbtValue::Float(*f),
            NbtTag::Double(d) => NbtValue::Double(*d),
            NbtTag::Byte(b) => NbtValue::Byte(*b),
            NbtTag::Short(s) => NbtValue::Short(*s),
            NbtTag::IntArray(arr) => NbtValue::IntArray(arr.clone()),
            NbtTag::LongArray(arr) => NbtValue::LongArray(arr.clone()),
            NbtTag::ByteArray(arr) => NbtValue::ByteArray(arr.clone()),
            NbtTag::List(list) => NbtValue::List(list.iter().map(NbtValue::from_tag).collect()),
            NbtTag::Compound(compound) => NbtValue::Compound(compound_to_map(compound)),
        }
    }

    pub fn to_tag(&self) -> NbtTag {
        match self {
            NbtValue::String(s) => NbtTag::String(s.clone()),
            NbtValue::Int(i) => NbtTag::Int(*i),
            NbtValue::Long(l) => NbtTag::Long(*l),
            NbtValue::Float(f) => NbtTag::Float(*f),
            NbtValue::Double(d) => NbtTag::Double(*d),
            NbtValue::Byte(b) => NbtTag::Byte(*b),
            NbtValue::Short(s) => NbtTag::Short(*s),
            NbtValue::Boolean(b) => NbtTag::Byte(if *b { 1 } else { 0 }),
            NbtValue::IntArray(arr) => NbtTag::IntArray(arr.clone()),
            NbtValue::LongArray(arr) => NbtTag::LongArray(arr.clone()),
            NbtValue::ByteArray(arr) => NbtTag::ByteArray(arr.clone()),
            NbtValue::List(list) => {
                let tags: Vec<NbtTag> = list.iter().map(NbtValue::to_tag).collect();
                NbtTag::List(NbtList::from(tags))
            }
            NbtValue::Compound(map) => NbtTag::Compound(map_to_compound(map)),
        }
    }

    /// Numeric value regardless of the stored width.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NbtValue::Int(v) => Some(*v as f64),
            NbtValue::Long(v) => Some(*v as f64),
            NbtValue::Float(v) => Some(*v as f64),
            NbtValue::Double(v) => Some(*v),
            NbtValue::Byte(v) => Some(*v as f64),
            NbtValue::Short(v) => Some(*v as f64),
            NbtValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NbtValue::Int(v) => Some(*v as i64),
            NbtValue::Long(v) => Some(*v),
            NbtValue::Byte(v) => Some(*v as i64),
            NbtValue::Short(v) => Some(*v as i64),
            NbtValue::Float(v) => Some(*v as i64),
            NbtValue::Double(v) => Some(*v as i64),
            NbtValue::Boolean(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NbtValue::String(s) => Some(s),
            _ => None,
        }
    }
}

pub fn compound_to_map(compound: &NbtCompound) -> HashMap<String, NbtValue> {
    compound
        .inner()
        .iter()
        .map(|(key, value)| (key.clone(), NbtValue::from_tag(value)))
        .collect()
}

pub fn map_to_compound(map: &HashMap<String, NbtValue>) -> NbtCompound {
    let mut compound = NbtCompound::new();
    for (key, value) in map {
        compound.insert(key, value.to_tag());
    }
    compound
}

/// Read an integer field stored as any numeric tag type.
pub fn get_int_lenient(compound: &NbtCompound, key: &str) -> Option<i64> {
    match compound.inner().get(key)? {
        NbtTag::Byte(v) => Some(*v as i64),
        NbtTag::Short(v) => Some(*v as i64),
        NbtTag::Int(v) => Some(*v as i64),
        NbtTag::Long(v) => Some(*v),
        NbtTag::Float(v) => Some(*v as i64),
        NbtTag::Double(v) => Some(*v as i64),
        _ => None,
    }
}

pub(crate) fn read_xyz(compound: &NbtCompound) -> Option<(i32, i32, i32)> {
    Some((
        compound.get::<_, i32>("x").ok()?,
        compound.get::<_, i32>("y").ok()?,
        compound.get::<_, i32>("z").ok()?,
    ))
}

pub(crate) fn xyz_compound(x: i32, y: i32, z: i32) -> NbtCompound {
    let mut compound = NbtCompound::new();
    compound.insert("x", x);
    compound.insert("y", y);
    compound.insert("z", z);
    compound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_values_survive_tag_conversion() {
        let mut inner = HashMap::new();
        inner.insert("Count".to_string(), NbtValue::Byte(3));
        inner.insert("id".to_string(), NbtValue::String("minecraft:dirt".to_string()));
        let value = NbtValue::List(vec![NbtValue::Compound(inner), NbtValue::Compound(HashMap::new())]);

        assert_eq!(NbtValue::from_tag(&value.to_tag()), value);
    }

    #[test]
    fn test_boolean_is_written_as_byte() {
        assert_eq!(NbtValue::Boolean(true).to_tag(), NbtTag::Byte(1));
        assert_eq!(NbtValue::from_tag(&NbtTag::Byte(1)), NbtValue::Byte(1));
    }

    #[test]
    fn test_lenient_int() {
        let mut compound = NbtCompound::new();
        compound.insert("a", 7i64);
        compound.insert("b", 2i16);
        compound.insert("c", "x");
        assert_eq!(get_int_lenient(&compound, "a"), Some(7));
        assert_eq!(get_int_lenient(&compound, "b"), Some(2));
        assert_eq!(get_int_lenient(&compound, "c"), None);
        assert_eq!(get_int_lenient(&compound, "missing"), None);
    }
}
