//! Shared plugin models and fixtures for integration tests

#![allow(dead_code)]

use reinhardt_cms_rest::entity::{Entity, ModelMeta, RelatedObject, fields_of};
use reinhardt_cms_rest::error::CmsResult;
use reinhardt_cms_rest::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

pub static TEXT: ModelMeta = ModelMeta::new("text.Text", &["id", "body"]);
pub static LINK: ModelMeta = ModelMeta::new("link.Link", &["id", "name", "url"]);
pub static SLIDE: ModelMeta = ModelMeta::new("carousel.Slide", &["id", "caption"]);
pub static CAPTION: ModelMeta = ModelMeta::new("carousel.Caption", &["id", "text"]);
static CAROUSEL_RELATED: [RelatedObject; 1] = [RelatedObject::new("slides", "carousel.Slide")];
pub static CAROUSEL: ModelMeta =
	ModelMeta::new("carousel.Carousel", &["id", "interval"]).with_related(&CAROUSEL_RELATED);

#[derive(Debug, Serialize)]
pub struct Text {
	pub id: i64,
	pub body: String,
}

impl Entity for Text {
	fn meta(&self) -> &'static ModelMeta {
		&TEXT
	}

	fn field_values(&self) -> CmsResult<Map<String, Value>> {
		fields_of(self)
	}
}

#[derive(Debug, Serialize)]
pub struct Link {
	pub id: i64,
	pub name: String,
	pub url: String,
}

impl Entity for Link {
	fn meta(&self) -> &'static ModelMeta {
		&LINK
	}

	fn field_values(&self) -> CmsResult<Map<String, Value>> {
		fields_of(self)
	}
}

#[derive(Debug, Serialize)]
pub struct Slide {
	pub id: i64,
	pub caption: String,
}

impl Entity for Slide {
	fn meta(&self) -> &'static ModelMeta {
		&SLIDE
	}

	fn field_values(&self) -> CmsResult<Map<String, Value>> {
		fields_of(self)
	}
}

#[derive(Debug, Serialize)]
pub struct Carousel {
	pub id: i64,
	pub interval: u32,
	#[serde(skip)]
	pub slides: Vec<Arc<dyn Entity>>,
}

impl Entity for Carousel {
	fn meta(&self) -> &'static ModelMeta {
		&CAROUSEL
	}

	fn field_values(&self) -> CmsResult<Map<String, Value>> {
		fields_of(self)
	}

	fn related(&self, accessor: &str) -> Vec<Arc<dyn Entity>> {
		match accessor {
			"slides" => self.slides.clone(),
			_ => Vec::new(),
		}
	}
}

pub fn text(id: i64, body: &str) -> Option<Arc<dyn Entity>> {
	Some(Arc::new(Text {
		id,
		body: body.to_string(),
	}))
}

pub fn link(id: i64, name: &str, url: &str) -> Option<Arc<dyn Entity>> {
	Some(Arc::new(Link {
		id,
		name: name.to_string(),
		url: url.to_string(),
	}))
}

pub fn carousel(id: i64, captions: &[&str]) -> Option<Arc<dyn Entity>> {
	let slides = captions
		.iter()
		.enumerate()
		.map(|(i, caption)| {
			Arc::new(Slide {
				id: i as i64 + 1,
				caption: caption.to_string(),
			}) as Arc<dyn Entity>
		})
		.collect();
	Some(Arc::new(Carousel {
		id,
		interval: 5,
		slides,
	}))
}

/// Text, link, carousel and two container types
pub fn plugin_pool() -> PluginPool {
	let mut pool = PluginPool::new();
	pool.register(PluginType::new("TextPlugin").with_model(&TEXT))
		.register(PluginType::new("LinkPlugin").with_model(&LINK))
		.register(
			PluginType::new("CarouselPlugin")
				.with_model(&CAROUSEL)
				.with_inlines([&SLIDE, &CAPTION]),
		)
		.register(PluginType::new("RowPlugin").with_children(ChildrenPolicy::allows([
			"ColumnPlugin",
		])))
		.register(
			PluginType::new("ColumnPlugin")
				.with_children(ChildrenPolicy::allows(["TextPlugin", "LinkPlugin"])),
		)
		.register(PluginType::new("SpacerPlugin"));
	pool
}

pub fn registry() -> SerializerRegistry {
	SerializerRegistry::new(Arc::new(ModelSerializerFactory::new(
		CacheKeying::EntityTypeAndFields,
	)))
}

/// A page on site 1 with one placeholder holding
///
/// ```text
/// 10 RowPlugin
/// ├── 11 ColumnPlugin
/// │   ├── 14 LinkPlugin
/// │   └── 13 TextPlugin
/// └── 12 ColumnPlugin
///     └── 15 TextPlugin
/// 20 TextPlugin (stored children are ignored)
/// └── 21 TextPlugin
/// 30 CarouselPlugin
/// ```
pub fn populated_cms() -> Arc<InMemoryCms> {
	let cms = Arc::new(InMemoryCms::new());
	cms.add_page(
		Page::new(1, 1)
			.with_title("en", PageTitle::new("Home", "home"))
			.with_title("de", PageTitle::new("Startseite", "startseite")),
	);
	cms.add_placeholder(Placeholder::new(100, "content", Some(1)));

	let rows = [
		(PluginRow::new(10, 100, "RowPlugin", "en").with_path("0001"), None),
		(
			PluginRow::new(11, 100, "ColumnPlugin", "en")
				.child_of(10, 0)
				.with_path("00010001"),
			None,
		),
		(
			PluginRow::new(12, 100, "ColumnPlugin", "en")
				.child_of(10, 1)
				.with_path("00010002"),
			None,
		),
		(
			PluginRow::new(14, 100, "LinkPlugin", "en")
				.child_of(11, 0)
				.with_path("000100010001"),
			link(2, "Docs", "https://example.com/docs"),
		),
		(
			PluginRow::new(13, 100, "TextPlugin", "en")
				.child_of(11, 1)
				.with_path("000100010002"),
			text(1, "left"),
		),
		(
			PluginRow::new(15, 100, "TextPlugin", "en")
				.child_of(12, 0)
				.with_path("000100020001"),
			text(3, "right"),
		),
		(
			PluginRow::new(20, 100, "TextPlugin", "en").with_path("0002"),
			text(4, "intro"),
		),
		(
			PluginRow::new(21, 100, "TextPlugin", "en")
				.child_of(20, 0)
				.with_path("00020001"),
			text(5, "orphaned"),
		),
		(
			PluginRow::new(30, 100, "CarouselPlugin", "en").with_path("0003"),
			carousel(1, &["first", "second"]),
		),
	];
	for (row, instance) in rows {
		cms.add_plugin(row, instance);
	}
	cms
}

/// Collect ids of a nested plugin record in depth-first pre-order
pub fn flatten(record: &Value, ids: &mut Vec<i64>) {
	if let Some(id) = record["id"].as_i64() {
		ids.push(id);
	}
	if let Some(children) = record["children"].as_array() {
		for child in children {
			flatten(child, ids);
		}
	}
}
