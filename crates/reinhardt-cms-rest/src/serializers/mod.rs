//! Serializers for CMS content
//!
//! - [`factory`]: generic model serializers built per entity type and cached
//! - [`registry`]: dedicated plugin serializers with the factory as fallback
//! - [`plugin`]: recursive plugin tree serialization
//! - [`page`]: localized page and placeholder serializers

pub mod factory;
pub mod page;
pub mod plugin;
pub mod registry;

pub use factory::{DeclaredField, FieldSpec, ModelSerializer, ModelSerializerFactory};
pub use page::{PageSerializer, PlaceholderSerializer};
pub use plugin::PluginTreeSerializer;
pub use registry::{ResolvedSerializer, SerializerRegistry};

use crate::entity::Entity;
use crate::error::CmsResult;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Read-side serializer over concrete entities
///
/// Implement this for plugin types that need a hand-written representation
/// and register it with [`SerializerRegistry::register`].
pub trait EntitySerializer: Send + Sync {
	/// Representation of a single entity
	fn to_representation(&self, entity: &dyn Entity) -> CmsResult<Map<String, Value>>;

	/// Representation of a collection (`many=True`)
	fn to_representation_many(&self, entities: &[Arc<dyn Entity>]) -> CmsResult<Vec<Value>> {
		entities
			.iter()
			.map(|entity| self.to_representation(entity.as_ref()).map(Value::Object))
			.collect()
	}
}
