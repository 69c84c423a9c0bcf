//! # Reinhardt CMS REST
//!
//! Read-only REST serialization for the CMS content tree, inspired by
//! djangocms-rest-api.
//!
//! Pages own placeholders, placeholders own a forest of plugins, and every
//! plugin row downcasts to a concrete, dynamically registered plugin model.
//! This crate turns that structure into language-localized JSON records.
//!
//! ## Features
//!
//! - **Plugin Tree Serialization**: Rebuilds a plugin's descendant tree and
//!   emits nested records with type-specific data and inline relations
//! - **Serializer Registry**: Dedicated serializers per plugin type with a
//!   cached generic model serializer fallback
//! - **Localized Page Views**: Every localized page field is resolved with a
//!   single request language
//! - **Visibility Policy**: Draft/published scoping per site and per-page
//!   visibility checks
//!
//! ## Architecture
//!
//! ```text
//! reinhardt-cms-rest
//! ├── entity       - Concrete model metadata and field access
//! ├── models       - Page, placeholder and plugin rows
//! ├── plugins      - Plugin type registration and capabilities
//! ├── tree         - Arena-backed plugin forest
//! ├── serializers  - Factory, registry, plugin tree, page and placeholder
//! ├── visibility   - Queryset scoping and page visibility
//! ├── source       - Storage, routing and site collaborators
//! ├── memory       - In-memory collaborator implementations
//! ├── settings     - Crate configuration
//! └── api          - List/retrieve operations for the view layer
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reinhardt_cms_rest::prelude::*;
//!
//! let api = CmsApi::new(settings, collaborators)?;
//! let request = RequestContext::new(Actor::anonymous()).with_language("de");
//! let page = api.retrieve_page(&request, 1).await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

// Re-export for downstream serializers
pub use serde_json;

pub mod api;
pub mod entity;
pub mod memory;
pub mod models;
pub mod plugins;
pub mod serializers;
pub mod settings;
pub mod source;
pub mod tree;
pub mod visibility;

pub mod prelude {
	//! Convenient re-exports of commonly used items

	pub use crate::api::{CmsApi, Collaborators, RequestContext};
	pub use crate::entity::{Entity, ModelMeta, RelatedObject};
	pub use crate::error::{CmsError, CmsResult};
	pub use crate::memory::InMemoryCms;
	pub use crate::models::{Actor, BoundPlugin, Page, PageTitle, Placeholder, PluginRow};
	pub use crate::plugins::{ChildrenPolicy, InlinePolicy, PluginPool, PluginType};
	pub use crate::serializers::{
		EntitySerializer, FieldSpec, ModelSerializerFactory, PageSerializer,
		PlaceholderSerializer, PluginTreeSerializer, SerializerRegistry,
	};
	pub use crate::settings::{CacheKeying, CmsRestSettings};
	pub use crate::source::{
		FixedSite, PagePermissions, PageStore, PluginSource, PublishedPages, SiteResolver,
		UrlReverser,
	};
	pub use crate::visibility::{PageQuery, VisibilityPolicy, scope};
}

/// CMS REST error types
pub mod error {
	use thiserror::Error;

	/// Errors raised while scoping, resolving or serializing CMS content
	#[derive(Error, Debug)]
	pub enum CmsError {
		/// Programmer error in serializer configuration
		#[error("Improperly configured: {0}")]
		Configuration(String),

		/// Requested object does not exist or is not visible
		#[error("Not found: {0}")]
		NotFound(String),

		/// Storage, routing or other collaborator failure
		#[error("Upstream failure: {0}")]
		Upstream(String),

		/// JSON conversion failure
		#[error("Serialization error: {0}")]
		Serialization(#[from] serde_json::Error),

		/// Invalid settings source
		#[error("Invalid settings: {0}")]
		Settings(String),
	}

	impl CmsError {
		/// Whether the error should surface as an absence at the HTTP boundary
		pub fn is_not_found(&self) -> bool {
			matches!(self, CmsError::NotFound(_))
		}
	}

	impl From<toml::de::Error> for CmsError {
		fn from(err: toml::de::Error) -> Self {
			CmsError::Settings(err.to_string())
		}
	}

	/// Result type for CMS REST operations
	pub type CmsResult<T> = Result<T, CmsError>;
}
