//! Plugin type registration
//!
//! A plugin type describes what a plugin row downcasts to: its backing model,
//! whether it may contain children and which inline relations it exposes.
//! Capabilities are explicit descriptors normalized once at registration, so
//! serializers never test for optional attributes.

use crate::entity::ModelMeta;
use std::collections::HashMap;
use std::sync::Arc;

/// Whether a plugin type may contain child plugins
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChildrenPolicy {
	/// Leaf plugin
	#[default]
	NoChildren,
	/// Container plugin accepting the listed child plugin types
	AllowsChildren {
		/// Plugin type names permitted as children
		permitted: Vec<String>,
	},
}

impl ChildrenPolicy {
	/// Container accepting the given child types
	pub fn allows<I, S>(permitted: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		ChildrenPolicy::AllowsChildren {
			permitted: permitted.into_iter().map(Into::into).collect(),
		}
	}

	/// Whether children are serialized for this plugin type
	pub fn allows_children(&self) -> bool {
		matches!(self, ChildrenPolicy::AllowsChildren { permitted } if !permitted.is_empty())
	}

	fn normalized(self) -> Self {
		if self.allows_children() {
			self
		} else {
			ChildrenPolicy::NoChildren
		}
	}
}

/// Inline relations a plugin type exposes alongside its own data
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InlinePolicy {
	/// No related collections
	#[default]
	NoInlines,
	/// Related collections of the listed models
	HasInlines {
		/// Models of the inline collections, in declaration order
		relations: Vec<&'static ModelMeta>,
	},
}

impl InlinePolicy {
	/// Inline declarations, empty for [`InlinePolicy::NoInlines`]
	pub fn relations(&self) -> &[&'static ModelMeta] {
		match self {
			InlinePolicy::NoInlines => &[],
			InlinePolicy::HasInlines { relations } => relations,
		}
	}

	fn normalized(self) -> Self {
		if self.relations().is_empty() {
			InlinePolicy::NoInlines
		} else {
			self
		}
	}
}

/// A registered plugin type (`CMSPluginBase` subclass)
///
/// # Examples
///
/// ```
/// use reinhardt_cms_rest::entity::ModelMeta;
/// use reinhardt_cms_rest::plugins::{ChildrenPolicy, PluginType};
///
/// static TEXT: ModelMeta = ModelMeta::new("text.Text", &["id", "body"]);
///
/// let text = PluginType::new("TextPlugin")
///     .with_model(&TEXT)
///     .with_children(ChildrenPolicy::allows(["LinkPlugin"]));
///
/// assert!(text.children().allows_children());
/// assert_eq!(text.model().map(|m| m.label), Some("text.Text"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginType {
	name: String,
	model: Option<&'static ModelMeta>,
	children: ChildrenPolicy,
	inlines: InlinePolicy,
}

impl PluginType {
	/// Model-less leaf plugin type
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			model: None,
			children: ChildrenPolicy::NoChildren,
			inlines: InlinePolicy::NoInlines,
		}
	}

	/// Set the backing data model
	pub fn with_model(mut self, model: &'static ModelMeta) -> Self {
		self.model = Some(model);
		self
	}

	/// Set the children capability
	pub fn with_children(mut self, children: ChildrenPolicy) -> Self {
		self.children = children;
		self
	}

	/// Declare inline related models
	pub fn with_inlines<I>(mut self, relations: I) -> Self
	where
		I: IntoIterator<Item = &'static ModelMeta>,
	{
		self.inlines = InlinePolicy::HasInlines {
			relations: relations.into_iter().collect(),
		};
		self
	}

	/// Plugin type name (the plugin row's type tag)
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Backing data model
	pub fn model(&self) -> Option<&'static ModelMeta> {
		self.model
	}

	/// Children capability
	pub fn children(&self) -> &ChildrenPolicy {
		&self.children
	}

	/// Inline capability
	pub fn inlines(&self) -> &InlinePolicy {
		&self.inlines
	}

	fn normalized(self) -> Self {
		Self {
			children: self.children.normalized(),
			inlines: self.inlines.normalized(),
			..self
		}
	}
}

/// Registry of plugin types keyed by type tag
#[derive(Debug, Default)]
pub struct PluginPool {
	plugins: HashMap<String, Arc<PluginType>>,
}

impl PluginPool {
	/// Create an empty pool
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a plugin type, replacing any previous registration
	pub fn register(&mut self, plugin: PluginType) -> &mut Self {
		let plugin = plugin.normalized();
		tracing::debug!(plugin_type = %plugin.name, "registering plugin type");
		self.plugins
			.insert(plugin.name.clone(), Arc::new(plugin));
		self
	}

	/// Look up a plugin type by tag
	pub fn get(&self, plugin_type: &str) -> Option<Arc<PluginType>> {
		self.plugins.get(plugin_type).cloned()
	}

	/// Look up a plugin type, treating unknown tags as capability-less
	pub fn get_or_default(&self, plugin_type: &str) -> Arc<PluginType> {
		self.get(plugin_type).unwrap_or_else(|| {
			tracing::warn!(plugin_type, "unknown plugin type, serializing without capabilities");
			Arc::new(PluginType::new(plugin_type))
		})
	}

	/// Whether a plugin type is registered
	pub fn contains(&self, plugin_type: &str) -> bool {
		self.plugins.contains_key(plugin_type)
	}

	/// Number of registered plugin types
	pub fn len(&self) -> usize {
		self.plugins.len()
	}

	/// Whether no plugin types are registered
	pub fn is_empty(&self) -> bool {
		self.plugins.is_empty()
	}
}
