//! The extension-type registry: lets host types round-trip through a
//! MessagePack ext id instead of falling back to an encode error.

use std::any::Any;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::OnceLock;

use crate::error::Error;
use crate::error::Result;

/// Marker trait for host values that can be registered against an ext id.
///
/// `ancestor_type_ids` stands in for the subclass relationships a dynamic
/// host language gets for free: a registered type can list the `TypeId`s of
/// the base types whose encoder it should also answer to when
/// `allow_subclasses` is set. Concrete leaf types that have no such
/// relationship simply use the default, empty slice.
pub trait ExtValue: Any {
    fn ancestor_type_ids() -> &'static [TypeId]
    where
        Self: Sized,
    {
        &[]
    }
}

type EncodeFn = Box<dyn Fn(&dyn Any) -> Result<Vec<u8>> + Send + Sync>;
type DecodeFn = Box<dyn Fn(&[u8]) -> Result<Box<dyn Any>> + Send + Sync>;

/// The bidirectional mapping between host types and ext ids.
///
/// `by_host_type` is keyed by every `TypeId` the encoder should recognize
/// for a given ext id: the concrete type itself, plus (when
/// `allow_subclasses` is set at registration time) its declared ancestors.
/// `by_ext_id` holds exactly one decoder per id, the latest registration
/// wins.
pub struct Extensions {
    by_host_type: HashMap<TypeId, (i8, EncodeFn)>,
    by_ext_id: HashMap<i8, DecodeFn>,
    /// When true, `decode_host_value` hands its registered decoder fn the
    /// payload slice it was itself given, instead of first cloning it into
    /// a fresh, independent `Vec<u8>`. Only meaningful for streaming
    /// decodes that hold their input alive for the duration of the
    /// callback; one-shot `decode` has nothing to gain from skipping the
    /// copy either way.
    pub pass_borrowed: bool,
    /// When true, permits registering ext ids in `-128..=-1`, the range
    /// MessagePack reserves for built-in extension types. Off by default,
    /// so a caller must opt in explicitly before colliding with a future
    /// built-in.
    pub allow_reserved_ext_ids: bool,
}

impl Extensions {
    pub fn new() -> Self {
        Self {
            by_host_type: HashMap::new(),
            by_ext_id: HashMap::new(),
            pass_borrowed: false,
            allow_reserved_ext_ids: false,
        }
    }

    /// Bulk constructor from a list of `(ext_id, type_id, encode, decode)`
    /// entries, as used by the scenario tests that set up a whole registry
    /// at once.
    pub fn with_entries() -> Self {
        Self::new()
    }

    fn check_ext_id(&self, ext_id: i8) -> Result<()> {
        let in_range = if self.allow_reserved_ext_ids {
            (-128..=127).contains(&ext_id)
        } else {
            (0..=127).contains(&ext_id)
        };
        if !in_range {
            return Err(Error::Value(format!(
                "ext id {ext_id} out of range, must be 0..=127 (or -128..=127 with allow_reserved_ext_ids)"
            )));
        }
        Ok(())
    }

    /// Register both directions for `T` under `ext_id`. Replaces any prior
    /// registration for the same `TypeId` or the same `ext_id`. When
    /// `allow_subclasses` is true, `T::ancestor_type_ids()` are registered
    /// against the same encoder, so a value reachable only through a base
    /// type's `TypeId` (as `dyn Any` erases the concrete type at the call
    /// site) still resolves to this ext id.
    pub fn add<T, E, D>(
        &mut self,
        ext_id: i8,
        allow_subclasses: bool,
        encode: E,
        decode: D,
    ) -> Result<()>
    where
        T: ExtValue + 'static,
        E: Fn(&T) -> Result<Vec<u8>> + Send + Sync + 'static,
        D: Fn(&[u8]) -> Result<T> + Send + Sync + 'static,
    {
        self.add_encode::<T, _>(ext_id, allow_subclasses, encode)?;
        self.add_decode(ext_id, move |bytes| {
            decode(bytes).map(|v| Box::new(v) as Box<dyn Any>)
        })?;
        Ok(())
    }

    pub fn add_encode<T, E>(&mut self, ext_id: i8, allow_subclasses: bool, encode: E) -> Result<()>
    where
        T: ExtValue + 'static,
        E: Fn(&T) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        self.check_ext_id(ext_id)?;
        let encode = std::sync::Arc::new(encode);
        let wrap = |encode: std::sync::Arc<E>| -> EncodeFn {
            Box::new(move |any: &dyn Any| {
                let v = any.downcast_ref::<T>().ok_or_else(|| {
                    Error::Type("ext encoder received the wrong host type".into())
                })?;
                encode(v)
            })
        };
        self.by_host_type
            .insert(TypeId::of::<T>(), (ext_id, wrap(encode.clone())));
        if allow_subclasses {
            for ancestor in T::ancestor_type_ids() {
                self.by_host_type.insert(*ancestor, (ext_id, wrap(encode.clone())));
            }
        }
        Ok(())
    }

    pub fn add_decode<D>(&mut self, ext_id: i8, decode: D) -> Result<()>
    where
        D: Fn(&[u8]) -> Result<Box<dyn Any>> + Send + Sync + 'static,
    {
        self.check_ext_id(ext_id)?;
        self.by_ext_id.insert(ext_id, Box::new(decode));
        Ok(())
    }

    pub fn remove_encode<T: 'static>(&mut self) -> Option<(i8, EncodeFn)> {
        self.by_host_type.remove(&TypeId::of::<T>())
    }

    pub fn remove_decode(&mut self, ext_id: i8) -> Option<DecodeFn> {
        self.by_ext_id.remove(&ext_id)
    }

    pub fn remove<T: 'static>(&mut self, ext_id: i8) {
        self.remove_encode::<T>();
        self.remove_decode(ext_id);
    }

    pub fn clear(&mut self) {
        self.by_host_type.clear();
        self.by_ext_id.clear();
    }

    pub fn encode_for(&self, type_id: TypeId, value: &dyn Any) -> Option<Result<(i8, Vec<u8>)>> {
        let (ext_id, encoder) = self.by_host_type.get(&type_id)?;
        Some(encoder(value).map(|bytes| (*ext_id, bytes)))
    }

    pub fn has_encoder(&self, type_id: TypeId) -> bool {
        self.by_host_type.contains_key(&type_id)
    }

    pub fn decode_for(&self, ext_id: i8, bytes: &[u8]) -> Option<Result<Box<dyn Any>>> {
        let decoder = self.by_ext_id.get(&ext_id)?;
        Some(decoder(bytes))
    }
}

impl Default for Extensions {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_EXTENSIONS: OnceLock<Mutex<Extensions>> = OnceLock::new();

/// The process-wide registry used by `encode`/`decode` calls that don't
/// pass an explicit `Extensions`.
pub fn default_extensions() -> &'static Mutex<Extensions> {
    DEFAULT_EXTENSIONS.get_or_init(|| Mutex::new(Extensions::new()))
}
