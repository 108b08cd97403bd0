//! `serde` serializer that writes argument values straight into
//! [`KeyPart`]s.
//!
//! Floats keep their bit pattern, `None` and `Some(None)` stay apart and
//! enum variants carry their name, so two different values never collapse
//! into one key part. Maps must have string keys.

use serde::ser::{self, Impossible, Serialize};

use super::key::KeyPart;
use crate::domain::errors::KeyValueError;

type Result<T> = std::result::Result<T, KeyValueError>;

pub(super) struct KeyPartSerializer;

impl ser::Serializer for KeyPartSerializer {
    type Ok = KeyPart;
    type Error = KeyValueError;
    type SerializeSeq = SeqBuilder;
    type SerializeTuple = SeqBuilder;
    type SerializeTupleStruct = SeqBuilder;
    type SerializeTupleVariant = VariantBuilder<SeqBuilder>;
    type SerializeMap = MapBuilder;
    type SerializeStruct = MapBuilder;
    type SerializeStructVariant = VariantBuilder<MapBuilder>;

    fn serialize_bool(self, v: bool) -> Result<KeyPart> {
        Ok(KeyPart::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<KeyPart> {
        Ok(KeyPart::Int(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<KeyPart> {
        Ok(KeyPart::Int(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<KeyPart> {
        Ok(KeyPart::Int(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<KeyPart> {
        Ok(KeyPart::Int(v))
    }

    fn serialize_i128(self, v: i128) -> Result<KeyPart> {
        if let Ok(i) = i64::try_from(v) {
            Ok(KeyPart::Int(i))
        } else if let Ok(u) = u64::try_from(v) {
            Ok(KeyPart::UInt(u))
        } else {
            Err(KeyValueError::new(format!("integer {v} does not fit in 64 bits")))
        }
    }

    fn serialize_u8(self, v: u8) -> Result<KeyPart> {
        Ok(KeyPart::Int(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<KeyPart> {
        Ok(KeyPart::Int(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<KeyPart> {
        Ok(KeyPart::Int(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<KeyPart> {
        Ok(KeyPart::from(v))
    }

    fn serialize_u128(self, v: u128) -> Result<KeyPart> {
        u64::try_from(v)
            .map(KeyPart::from)
            .map_err(|_| KeyValueError::new(format!("integer {v} does not fit in 64 bits")))
    }

    fn serialize_f32(self, v: f32) -> Result<KeyPart> {
        Ok(KeyPart::float(f64::from(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<KeyPart> {
        Ok(KeyPart::float(v))
    }

    fn serialize_char(self, v: char) -> Result<KeyPart> {
        Ok(KeyPart::Str(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<KeyPart> {
        Ok(KeyPart::Str(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<KeyPart> {
        Ok(KeyPart::Bytes(v.to_vec()))
    }

    fn serialize_none(self) -> Result<KeyPart> {
        Ok(KeyPart::Opt(None))
    }

    fn serialize_some<T>(self, value: &T) -> Result<KeyPart>
    where
        T: ?Sized + Serialize,
    {
        Ok(KeyPart::Opt(Some(Box::new(value.serialize(self)?))))
    }

    fn serialize_unit(self) -> Result<KeyPart> {
        Ok(KeyPart::Unit)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<KeyPart> {
        Ok(KeyPart::Unit)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<KeyPart> {
        Ok(KeyPart::variant(variant, KeyPart::Unit))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<KeyPart>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<KeyPart>
    where
        T: ?Sized + Serialize,
    {
        Ok(KeyPart::variant(variant, value.serialize(self)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqBuilder> {
        Ok(SeqBuilder::with_capacity(len.unwrap_or(0)))
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqBuilder> {
        Ok(SeqBuilder::with_capacity(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SeqBuilder> {
        Ok(SeqBuilder::with_capacity(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantBuilder<SeqBuilder>> {
        Ok(VariantBuilder {
            variant,
            inner: SeqBuilder::with_capacity(len),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapBuilder> {
        Ok(MapBuilder::with_capacity(len.unwrap_or(0)))
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<MapBuilder> {
        Ok(MapBuilder::with_capacity(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantBuilder<MapBuilder>> {
        Ok(VariantBuilder {
            variant,
            inner: MapBuilder::with_capacity(len),
        })
    }
}

pub(super) struct SeqBuilder {
    items: Vec<KeyPart>,
}

impl SeqBuilder {
    fn with_capacity(len: usize) -> Self {
        Self {
            items: Vec::with_capacity(len),
        }
    }

    fn push<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.items.push(value.serialize(KeyPartSerializer)?);
        Ok(())
    }

    fn finish(self) -> KeyPart {
        KeyPart::Seq(self.items)
    }
}

impl ser::SerializeSeq for SeqBuilder {
    type Ok = KeyPart;
    type Error = KeyValueError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<KeyPart> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for SeqBuilder {
    type Ok = KeyPart;
    type Error = KeyValueError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<KeyPart> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for SeqBuilder {
    type Ok = KeyPart;
    type Error = KeyValueError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<KeyPart> {
        Ok(self.finish())
    }
}

/// Entries are sorted by name when the map ends, so iteration order of the
/// source map never reaches the key.
pub(super) struct MapBuilder {
    entries: Vec<(String, KeyPart)>,
    pending_key: Option<String>,
}

impl MapBuilder {
    fn with_capacity(len: usize) -> Self {
        Self {
            entries: Vec::with_capacity(len),
            pending_key: None,
        }
    }

    fn push<T>(&mut self, name: String, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.entries.push((name, value.serialize(KeyPartSerializer)?));
        Ok(())
    }

    fn finish(mut self) -> KeyPart {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        KeyPart::Map(self.entries)
    }
}

impl ser::SerializeMap for MapBuilder {
    type Ok = KeyPart;
    type Error = KeyValueError;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.pending_key = Some(key.serialize(MapKeySerializer)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let name = self
            .pending_key
            .take()
            .ok_or_else(|| KeyValueError::new("map value serialized before its key"))?;
        self.push(name, value)
    }

    fn end(self) -> Result<KeyPart> {
        Ok(self.finish())
    }
}

impl ser::SerializeStruct for MapBuilder {
    type Ok = KeyPart;
    type Error = KeyValueError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(key.to_owned(), value)
    }

    fn end(self) -> Result<KeyPart> {
        Ok(self.finish())
    }
}

pub(super) struct VariantBuilder<B> {
    variant: &'static str,
    inner: B,
}

impl ser::SerializeTupleVariant for VariantBuilder<SeqBuilder> {
    type Ok = KeyPart;
    type Error = KeyValueError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.inner.push(value)
    }

    fn end(self) -> Result<KeyPart> {
        Ok(KeyPart::variant(self.variant, self.inner.finish()))
    }
}

impl ser::SerializeStructVariant for VariantBuilder<MapBuilder> {
    type Ok = KeyPart;
    type Error = KeyValueError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.inner.push(key.to_owned(), value)
    }

    fn end(self) -> Result<KeyPart> {
        Ok(KeyPart::variant(self.variant, self.inner.finish()))
    }
}

/// Accepts only values that are naturally strings: `str`, `char` and unit
/// enum variants.
struct MapKeySerializer;

fn non_string_key() -> KeyValueError {
    KeyValueError::new("map keys must be strings")
}

impl ser::Serializer for MapKeySerializer {
    type Ok = String;
    type Error = KeyValueError;
    type SerializeSeq = Impossible<String, KeyValueError>;
    type SerializeTuple = Impossible<String, KeyValueError>;
    type SerializeTupleStruct = Impossible<String, KeyValueError>;
    type SerializeTupleVariant = Impossible<String, KeyValueError>;
    type SerializeMap = Impossible<String, KeyValueError>;
    type SerializeStruct = Impossible<String, KeyValueError>;
    type SerializeStructVariant = Impossible<String, KeyValueError>;

    fn serialize_str(self, v: &str) -> Result<String> {
        Ok(v.to_owned())
    }

    fn serialize_char(self, v: char) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<String> {
        Ok(variant.to_owned())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_bool(self, _v: bool) -> Result<String> {
        Err(non_string_key())
    }

    fn serialize_i8(self, _v: i8) -> Result<String> {
        Err(non_string_key())
    }

    fn serialize_i16(self, _v: i16) -> Result<String> {
        Err(non_string_key())
    }

    fn serialize_i32(self, _v: i32) -> Result<String> {
        Err(non_string_key())
    }

    fn serialize_i64(self, _v: i64) -> Result<String> {
        Err(non_string_key())
    }

    fn serialize_u8(self, _v: u8) -> Result<String> {
        Err(non_string_key())
    }

    fn serialize_u16(self, _v: u16) -> Result<String> {
        Err(non_string_key())
    }

    fn serialize_u32(self, _v: u32) -> Result<String> {
        Err(non_string_key())
    }

    fn serialize_u64(self, _v: u64) -> Result<String> {
        Err(non_string_key())
    }

    fn serialize_f32(self, _v: f32) -> Result<String> {
        Err(non_string_key())
    }

    fn serialize_f64(self, _v: f64) -> Result<String> {
        Err(non_string_key())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String> {
        Err(non_string_key())
    }

    fn serialize_none(self) -> Result<String> {
        Err(non_string_key())
    }

    fn serialize_some<T>(self, _value: &T) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        Err(non_string_key())
    }

    fn serialize_unit(self) -> Result<String> {
        Err(non_string_key())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String> {
        Err(non_string_key())
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        Err(non_string_key())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(non_string_key())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(non_string_key())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(non_string_key())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(non_string_key())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(non_string_key())
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(non_string_key())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(non_string_key())
    }
}
