//! Plugin serializer resolution
//!
//! Plugin types may register a dedicated serializer. Everything else goes
//! through the generic [`ModelSerializerFactory`].

use crate::entity::{Entity, ModelMeta};
use crate::error::{CmsError, CmsResult};
use crate::plugins::PluginType;
use crate::serializers::{EntitySerializer, FieldSpec, ModelSerializerFactory};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Serializer handed out by [`SerializerRegistry::resolve`]
///
/// Read-only unless the caller opts out with [`ResolvedSerializer::writable`].
#[derive(Clone)]
pub struct ResolvedSerializer {
	inner: Arc<dyn EntitySerializer>,
	read_only: bool,
	dedicated: bool,
}

impl ResolvedSerializer {
	/// Clear the read-only flag
	pub fn writable(mut self) -> Self {
		self.read_only = false;
		self
	}

	/// Whether the serializer rejects writes
	pub fn is_read_only(&self) -> bool {
		self.read_only
	}

	/// Whether the serializer was registered for a plugin type rather than
	/// generated by the factory
	pub fn is_dedicated(&self) -> bool {
		self.dedicated
	}

	/// Representation of a single entity
	pub fn data(&self, entity: &dyn Entity) -> CmsResult<Map<String, Value>> {
		self.inner.to_representation(entity)
	}

	/// Representation of a collection
	pub fn data_many(&self, entities: &[Arc<dyn Entity>]) -> CmsResult<Vec<Value>> {
		self.inner.to_representation_many(entities)
	}
}

impl fmt::Debug for ResolvedSerializer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResolvedSerializer")
			.field("read_only", &self.read_only)
			.field("dedicated", &self.dedicated)
			.finish()
	}
}

/// Plugin type → dedicated serializer mapping with factory fallback
pub struct SerializerRegistry {
	dedicated: HashMap<String, Arc<dyn EntitySerializer>>,
	factory: Arc<ModelSerializerFactory>,
}

impl SerializerRegistry {
	/// Registry backed by the given factory
	pub fn new(factory: Arc<ModelSerializerFactory>) -> Self {
		Self {
			dedicated: HashMap::new(),
			factory,
		}
	}

	/// Registry backed by the process-wide factory
	pub fn with_global_factory() -> Self {
		Self::new(ModelSerializerFactory::global())
	}

	/// Register a dedicated serializer for a plugin type name
	pub fn register<S>(&mut self, plugin_type: impl Into<String>, serializer: S) -> &mut Self
	where
		S: EntitySerializer + 'static,
	{
		self.dedicated
			.insert(plugin_type.into(), Arc::new(serializer));
		self
	}

	/// Whether a plugin type has a dedicated serializer
	pub fn has_dedicated(&self, plugin_type: &str) -> bool {
		self.dedicated.contains_key(plugin_type)
	}

	/// The backing factory
	pub fn factory(&self) -> &Arc<ModelSerializerFactory> {
		&self.factory
	}

	/// Resolve the serializer for a plugin type and/or model
	///
	/// A dedicated serializer registered for `plugin` wins. Otherwise a
	/// generic serializer is built for `model`, or for the plugin type's own
	/// model when `model` is absent.
	///
	/// # Errors
	///
	/// [`CmsError::Configuration`] when neither argument is given or no model
	/// can be determined for the fallback.
	pub fn resolve(
		&self,
		plugin: Option<&PluginType>,
		model: Option<&'static ModelMeta>,
	) -> CmsResult<ResolvedSerializer> {
		if plugin.is_none() && model.is_none() {
			return Err(CmsError::Configuration(
				"a plugin type or a model is required to resolve a serializer".to_string(),
			));
		}

		if let Some(serializer) = plugin.and_then(|p| self.dedicated.get(p.name())) {
			return Ok(ResolvedSerializer {
				inner: serializer.clone(),
				read_only: true,
				dedicated: true,
			});
		}

		let model = model.or_else(|| plugin.and_then(PluginType::model)).ok_or_else(|| {
			CmsError::Configuration(format!(
				"plugin type '{}' has neither a dedicated serializer nor a model",
				plugin.map(PluginType::name).unwrap_or_default()
			))
		})?;

		let serializer = self.factory.get_or_build(model, FieldSpec::new())?;
		Ok(ResolvedSerializer {
			inner: serializer,
			read_only: true,
			dedicated: false,
		})
	}
}

impl Default for SerializerRegistry {
	fn default() -> Self {
		Self::with_global_factory()
	}
}

impl fmt::Debug for SerializerRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut dedicated: Vec<_> = self.dedicated.keys().collect();
		dedicated.sort();
		f.debug_struct("SerializerRegistry")
			.field("dedicated", &dedicated)
			.field("factory", &self.factory)
			.finish()
	}
}
