//! Plugin tree serialization
//!
//! Serializes one plugin and, when its type allows children, the whole
//! subtree below it. Every record has the same shape:
//!
//! ```text
//! id, placeholder, parent, position, language, plugin_type,
//! creation_date, changed_date, plugin_data, inlines, children
//! ```
//!
//! Descendants are fetched once, downcast in a single batch and linked into a
//! [`PluginTree`]; the nested output is then emitted from memory.

use crate::error::{CmsError, CmsResult};
use crate::models::{BoundPlugin, PluginRow};
use crate::plugins::{PluginPool, PluginType};
use crate::serializers::SerializerRegistry;
use crate::source::PluginSource;
use crate::tree::{PluginNode, PluginTree};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Serializer for a plugin and its subtree
pub struct PluginTreeSerializer<'a> {
	source: &'a dyn PluginSource,
	pool: &'a PluginPool,
	registry: &'a SerializerRegistry,
}

impl<'a> PluginTreeSerializer<'a> {
	/// Create a serializer over the given collaborators
	pub fn new(
		source: &'a dyn PluginSource,
		pool: &'a PluginPool,
		registry: &'a SerializerRegistry,
	) -> Self {
		Self {
			source,
			pool,
			registry,
		}
	}

	/// Serialize `row` with its type-specific data, inlines and children
	pub async fn serialize(&self, row: &PluginRow) -> CmsResult<Value> {
		let plugin_type = self.pool.get_or_default(&row.plugin_type);

		if !plugin_type.children().allows_children() {
			let bound = self
				.source
				.downcast(vec![row.clone()])
				.await?
				.into_iter()
				.next()
				.ok_or_else(|| missing_downcast(row))?;
			return Ok(Value::Object(self.record(&bound, &plugin_type, Vec::new())?));
		}

		let mut flat = Vec::new();
		flat.push(row.clone());
		flat.extend(self.source.descendants(row).await?);
		let bound = self.source.downcast(flat).await?;
		tracing::debug!(
			plugin_id = row.id,
			nodes = bound.len(),
			"rebuilding plugin subtree"
		);

		let tree = PluginTree::build_rooted(row.id, bound);
		let root = tree.get(row.id).ok_or_else(|| missing_downcast(row))?;
		self.node(root)
	}

	/// Serialize several root plugins, e.g. the contents of a placeholder
	pub async fn serialize_many(&self, rows: &[PluginRow]) -> CmsResult<Vec<Value>> {
		let mut data = Vec::with_capacity(rows.len());
		for row in rows {
			data.push(self.serialize(row).await?);
		}
		Ok(data)
	}

	fn node(&self, node: PluginNode<'_>) -> CmsResult<Value> {
		let plugin = node.plugin();
		let plugin_type = self.pool.get_or_default(&plugin.row.plugin_type);

		let children = if plugin_type.children().allows_children() {
			node.children()
				.map(|child| self.node(child))
				.collect::<CmsResult<Vec<_>>>()?
		} else {
			if node.child_count() > 0 {
				tracing::debug!(
					plugin_id = plugin.id(),
					plugin_type = plugin_type.name(),
					"plugin type does not allow children, skipping stored descendants"
				);
			}
			Vec::new()
		};

		Ok(Value::Object(self.record(plugin, &plugin_type, children)?))
	}

	fn record(
		&self,
		plugin: &BoundPlugin,
		plugin_type: &Arc<PluginType>,
		children: Vec<Value>,
	) -> CmsResult<Map<String, Value>> {
		let mut data = match serde_json::to_value(&plugin.row)? {
			Value::Object(map) => map,
			_ => Map::new(),
		};
		data.insert(
			"plugin_data".to_string(),
			Value::Object(self.plugin_data(plugin, plugin_type)?),
		);
		data.insert(
			"inlines".to_string(),
			Value::Object(self.inlines(plugin, plugin_type)?),
		);
		data.insert("children".to_string(), Value::Array(children));
		Ok(data)
	}

	fn plugin_data(
		&self,
		plugin: &BoundPlugin,
		plugin_type: &PluginType,
	) -> CmsResult<Map<String, Value>> {
		let Some(model) = plugin_type.model() else {
			return Ok(Map::new());
		};
		let Some(instance) = plugin.instance.as_deref() else {
			tracing::warn!(
				plugin_id = plugin.id(),
				model = model.label,
				"plugin has a model but no concrete instance"
			);
			return Ok(Map::new());
		};

		self.registry
			.resolve(Some(plugin_type), Some(model))?
			.data(instance)
	}

	fn inlines(
		&self,
		plugin: &BoundPlugin,
		plugin_type: &PluginType,
	) -> CmsResult<Map<String, Value>> {
		let mut data = Map::new();
		let Some(instance) = plugin.instance.as_deref() else {
			return Ok(data);
		};

		for inline in plugin_type.inlines().relations() {
			let Some(related) = instance.meta().related_to(inline) else {
				tracing::debug!(
					plugin_id = plugin.id(),
					inline = inline.label,
					"no matching relation for inline, skipping"
				);
				continue;
			};

			let serializer = self.registry.resolve(None, Some(*inline))?;
			let objects = instance.related(related.name);
			data.insert(
				related.name.to_string(),
				Value::Array(serializer.data_many(&objects)?),
			);
		}

		Ok(data)
	}
}

fn missing_downcast(row: &PluginRow) -> CmsError {
	CmsError::Upstream(format!(
		"plugin source did not return plugin {} when downcasting",
		row.id
	))
}
