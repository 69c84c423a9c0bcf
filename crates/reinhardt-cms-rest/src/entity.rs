//! Concrete model metadata and field access
//!
//! Plugin rows downcast to concrete model instances whose shape is only known
//! at registration time. [`Entity`] is the object-safe view the serializers
//! work against, and [`ModelMeta`] plays the role of Django's `Model._meta`.

use crate::error::CmsResult;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Reverse relation exposed by a model (Django's `_meta.related_objects`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelatedObject {
	/// Accessor name on the owning instance (e.g. `"slides"`)
	pub name: &'static str,
	/// Label of the related model (e.g. `"carousel.Slide"`)
	pub related_model: &'static str,
}

impl RelatedObject {
	/// Create a related-object descriptor
	pub const fn new(name: &'static str, related_model: &'static str) -> Self {
		Self {
			name,
			related_model,
		}
	}
}

/// Static description of a model type
///
/// The label is the type identity used by the serializer cache, so two
/// distinct models must never share one.
///
/// # Examples
///
/// ```
/// use reinhardt_cms_rest::entity::{ModelMeta, RelatedObject};
///
/// static SLIDE: ModelMeta = ModelMeta::new("carousel.Slide", &["id", "caption"]);
/// static RELATED: [RelatedObject; 1] = [RelatedObject::new("slides", "carousel.Slide")];
/// static CAROUSEL: ModelMeta =
///     ModelMeta::new("carousel.Carousel", &["id", "interval"]).with_related(&RELATED);
///
/// assert_eq!(CAROUSEL.related_to(&SLIDE).map(|r| r.name), Some("slides"));
/// ```
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ModelMeta {
	/// Unique model label (`app.Model`)
	pub label: &'static str,
	/// Concrete field names in declaration order
	pub fields: &'static [&'static str],
	/// Reverse relations pointing at this model
	pub related_objects: &'static [RelatedObject],
}

impl ModelMeta {
	/// Create metadata without reverse relations
	pub const fn new(label: &'static str, fields: &'static [&'static str]) -> Self {
		Self {
			label,
			fields,
			related_objects: &[],
		}
	}

	/// Attach reverse relation descriptors
	pub const fn with_related(self, related_objects: &'static [RelatedObject]) -> Self {
		Self {
			label: self.label,
			fields: self.fields,
			related_objects,
		}
	}

	/// First reverse relation whose related model is `model`
	pub fn related_to(&self, model: &ModelMeta) -> Option<&RelatedObject> {
		self.related_objects
			.iter()
			.find(|related| related.related_model == model.label)
	}
}

impl fmt::Display for ModelMeta {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label)
	}
}

/// Object-safe view of a concrete model instance
pub trait Entity: Send + Sync + fmt::Debug {
	/// Static metadata of the concrete type
	fn meta(&self) -> &'static ModelMeta;

	/// All concrete field values keyed by field name
	fn field_values(&self) -> CmsResult<Map<String, Value>>;

	/// Related collection behind a reverse-relation accessor
	///
	/// Instances without reverse relations keep the empty default.
	fn related(&self, _accessor: &str) -> Vec<Arc<dyn Entity>> {
		Vec::new()
	}
}

/// Collect the fields of a serde-serializable struct into an ordered map
///
/// Intended for [`Entity::field_values`] implementations. Non-object values
/// are rejected so a misconfigured model cannot silently produce garbage.
pub fn fields_of<T: Serialize>(value: &T) -> CmsResult<Map<String, Value>> {
	match serde_json::to_value(value)? {
		Value::Object(map) => Ok(map),
		other => Err(crate::error::CmsError::Configuration(format!(
			"entity fields must serialize to an object, got {}",
			other
		))),
	}
}
