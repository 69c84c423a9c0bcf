//! Generic model serializers
//!
//! Equivalent of Django REST Framework's `ModelSerializer` generated on the fly
//! for models that have no dedicated serializer. The factory caches one
//! serializer per cache key; see [`CacheKeying`] for what the key covers.

use crate::entity::{Entity, ModelMeta};
use crate::error::{CmsError, CmsResult};
use crate::serializers::EntitySerializer;
use crate::settings::CacheKeying;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Computed field evaluated against the entity being serialized
/// (`SerializerMethodField` equivalent)
pub type DeclaredField = Arc<dyn Fn(&dyn Entity) -> CmsResult<Value> + Send + Sync>;

/// Field configuration for a generated serializer
///
/// `fields` is an allow-list, `exclude` a deny-list; they are mutually
/// exclusive. Declared fields are appended after model fields in the order
/// they were declared.
///
/// # Examples
///
/// ```
/// use reinhardt_cms_rest::serializers::FieldSpec;
/// use serde_json::json;
///
/// let spec = FieldSpec::new()
///     .with_fields(["id", "body"])
///     .declare("kind", |_| Ok(json!("text")));
///
/// assert!(spec.validate().is_ok());
/// assert!(FieldSpec::new().with_fields(["id"]).with_exclude(["body"]).validate().is_err());
/// ```
#[derive(Clone, Default)]
pub struct FieldSpec {
	fields: Option<Vec<String>>,
	exclude: Option<Vec<String>>,
	declared: Vec<(String, DeclaredField)>,
}

impl FieldSpec {
	/// Empty specification: every model field, nothing declared
	pub fn new() -> Self {
		Self::default()
	}

	/// Restrict output to the given model fields, in the given order
	pub fn with_fields<I, S>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.fields = Some(fields.into_iter().map(Into::into).collect());
		self
	}

	/// Drop the given model fields from the output
	pub fn with_exclude<I, S>(mut self, exclude: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.exclude = Some(exclude.into_iter().map(Into::into).collect());
		self
	}

	/// Add a computed field
	pub fn declare<F>(mut self, name: impl Into<String>, field: F) -> Self
	where
		F: Fn(&dyn Entity) -> CmsResult<Value> + Send + Sync + 'static,
	{
		self.declare_shared(name, Arc::new(field))
	}

	/// Add an already shared computed field
	///
	/// Under [`CacheKeying::EntityTypeAndFields`] declared fields are keyed by
	/// closure identity, so reusing one [`DeclaredField`] across calls is what
	/// lets them hit the cache.
	pub fn declare_shared(mut self, name: impl Into<String>, field: DeclaredField) -> Self {
		self.declared.push((name.into(), field));
		self
	}

	/// Reject an allow-list combined with a deny-list
	pub fn validate(&self) -> CmsResult<()> {
		if self.fields.is_some() && self.exclude.is_some() {
			return Err(CmsError::Configuration(
				"cannot set both 'fields' and 'exclude' on a serializer".to_string(),
			));
		}
		Ok(())
	}

	fn normalized(&self) -> NormalizedSpec {
		let mut exclude = self.exclude.clone().unwrap_or_default();
		exclude.sort();
		exclude.dedup();

		NormalizedSpec {
			fields: self.fields.clone(),
			exclude,
			declared: self
				.declared
				.iter()
				.map(|(name, field)| (name.clone(), field_identity(field)))
				.collect(),
		}
	}
}

impl fmt::Debug for FieldSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FieldSpec")
			.field("fields", &self.fields)
			.field("exclude", &self.exclude)
			.field(
				"declared",
				&self.declared.iter().map(|(name, _)| name).collect::<Vec<_>>(),
			)
			.finish()
	}
}

// Cached serializers hold their closures, so an address stays unique while
// its key is in the cache
fn field_identity(field: &DeclaredField) -> usize {
	Arc::as_ptr(field) as *const () as usize
}

// Field order of an allow-list is observable, exclusion order is not
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NormalizedSpec {
	fields: Option<Vec<String>>,
	exclude: Vec<String>,
	declared: Vec<(String, usize)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
	Entity(&'static str),
	EntityAndFields(&'static str, NormalizedSpec),
}

/// Serializer generated for one model type
pub struct ModelSerializer {
	name: String,
	meta: &'static ModelMeta,
	fields: Vec<String>,
	declared: Vec<(String, DeclaredField)>,
}

impl ModelSerializer {
	/// Build a serializer for `meta` honoring `spec`
	///
	/// Unknown names in the allow- or deny-list are configuration errors.
	pub fn build(meta: &'static ModelMeta, spec: FieldSpec) -> CmsResult<Self> {
		spec.validate()?;

		let unknown = |name: &String| !meta.fields.contains(&name.as_str());
		if let Some(name) = spec
			.fields
			.iter()
			.chain(spec.exclude.iter())
			.flatten()
			.find(|name| unknown(*name))
		{
			return Err(CmsError::Configuration(format!(
				"field '{}' is not a field of model '{}'",
				name, meta
			)));
		}

		let fields = match (&spec.fields, &spec.exclude) {
			(Some(allowed), _) => allowed.clone(),
			(None, Some(excluded)) => meta
				.fields
				.iter()
				.filter(|name| !excluded.iter().any(|e| e == *name))
				.map(|name| name.to_string())
				.collect(),
			(None, None) => meta.fields.iter().map(|name| name.to_string()).collect(),
		};

		let model_name = meta.label.rsplit('.').next().unwrap_or(meta.label);
		Ok(Self {
			name: format!("{}Serializer", model_name),
			meta,
			fields,
			declared: spec.declared,
		})
	}

	/// Generated serializer name (`<Model>Serializer`)
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Model the serializer is bound to
	pub fn meta(&self) -> &'static ModelMeta {
		self.meta
	}

	/// Output field names in emission order
	pub fn field_names(&self) -> Vec<&str> {
		self.fields
			.iter()
			.map(String::as_str)
			.chain(self.declared.iter().map(|(name, _)| name.as_str()))
			.collect()
	}
}

impl EntitySerializer for ModelSerializer {
	fn to_representation(&self, entity: &dyn Entity) -> CmsResult<Map<String, Value>> {
		if entity.meta().label != self.meta.label {
			return Err(CmsError::Configuration(format!(
				"{} cannot represent an instance of '{}'",
				self.name,
				entity.meta()
			)));
		}

		let mut values = entity.field_values()?;
		let mut data = Map::with_capacity(self.fields.len() + self.declared.len());
		for name in &self.fields {
			data.insert(name.clone(), values.remove(name).unwrap_or(Value::Null));
		}
		for (name, field) in &self.declared {
			data.insert(name.clone(), field(entity)?);
		}
		Ok(data)
	}
}

impl fmt::Debug for ModelSerializer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ModelSerializer")
			.field("name", &self.name)
			.field("model", &self.meta.label)
			.field("fields", &self.field_names())
			.finish()
	}
}

/// Process-wide factory used when callers do not bring their own
static GLOBAL_FACTORY: Lazy<Arc<ModelSerializerFactory>> =
	Lazy::new(|| Arc::new(ModelSerializerFactory::new(CacheKeying::default())));

/// Builds and caches [`ModelSerializer`]s
///
/// Lookups take a shared lock. A miss builds outside the lock and inserts
/// with `entry().or_insert`, so two racing first callers may both build but
/// only the first insertion is kept and returned to both.
///
/// # Examples
///
/// ```
/// use reinhardt_cms_rest::entity::ModelMeta;
/// use reinhardt_cms_rest::serializers::{FieldSpec, ModelSerializerFactory};
/// use reinhardt_cms_rest::settings::CacheKeying;
/// use std::sync::Arc;
///
/// static TEXT: ModelMeta = ModelMeta::new("text.Text", &["id", "body"]);
///
/// let factory = ModelSerializerFactory::new(CacheKeying::EntityType);
/// let first = factory.get_or_build(&TEXT, FieldSpec::new()).unwrap();
/// let second = factory.get_or_build(&TEXT, FieldSpec::new().with_fields(["id"])).unwrap();
///
/// assert!(Arc::ptr_eq(&first, &second));
/// assert_eq!(first.name(), "TextSerializer");
/// ```
#[derive(Debug)]
pub struct ModelSerializerFactory {
	keying: CacheKeying,
	cache: RwLock<HashMap<CacheKey, Arc<ModelSerializer>>>,
}

impl ModelSerializerFactory {
	/// Create a factory with an empty cache
	pub fn new(keying: CacheKeying) -> Self {
		Self {
			keying,
			cache: RwLock::new(HashMap::new()),
		}
	}

	/// Process-wide factory
	pub fn global() -> Arc<Self> {
		GLOBAL_FACTORY.clone()
	}

	/// Cache keying strategy
	pub fn keying(&self) -> CacheKeying {
		self.keying
	}

	/// Cached serializer for `meta`, building it on first use
	///
	/// Under [`CacheKeying::EntityType`] a hit ignores `spec` entirely; the
	/// first serializer built for a model is returned for every later call.
	pub fn get_or_build(
		&self,
		meta: &'static ModelMeta,
		spec: FieldSpec,
	) -> CmsResult<Arc<ModelSerializer>> {
		spec.validate()?;

		let key = match self.keying {
			CacheKeying::EntityType => CacheKey::Entity(meta.label),
			CacheKeying::EntityTypeAndFields => {
				CacheKey::EntityAndFields(meta.label, spec.normalized())
			}
		};

		if let Some(serializer) = self.cache.read().get(&key) {
			tracing::debug!(model = meta.label, "model serializer cache hit");
			return Ok(serializer.clone());
		}

		let built = Arc::new(ModelSerializer::build(meta, spec)?);
		tracing::debug!(
			model = meta.label,
			serializer = built.name(),
			"built model serializer"
		);

		let mut cache = self.cache.write();
		Ok(cache.entry(key).or_insert(built).clone())
	}

	/// Number of cached serializers
	pub fn len(&self) -> usize {
		self.cache.read().len()
	}

	/// Whether the cache is empty
	pub fn is_empty(&self) -> bool {
		self.cache.read().is_empty()
	}

	/// Drop every cached serializer
	///
	/// This is primarily useful for testing.
	pub fn clear(&self) {
		self.cache.write().clear();
	}
}
