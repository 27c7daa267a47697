use crate::core::space::TileCoord;

/// Trait representing anything that can produce tile URLs for a given coordinate.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `coord`.
    fn url(&self, coord: TileCoord) -> String;
}

/// Tile source expanding `{z}/{x}/{y}` URL templates
///
/// With more than one template the request is pinned to a mirror by the
/// coordinate's deterministic hash, so the same tile always hits the same
/// endpoint.
pub struct TemplateSource {
    templates: Vec<String>,
}

impl TemplateSource {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            templates: vec![template.into()],
        }
    }

    pub fn from_mirrors(templates: Vec<String>) -> Self {
        debug_assert!(!templates.is_empty(), "mirror list must not be empty");
        Self { templates }
    }

    /// The default OpenStreetMap tile servers
    pub fn openstreetmap() -> Self {
        Self::from_mirrors(
            ["a", "b", "c"]
                .iter()
                .map(|sub| format!("https://{}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png", sub))
                .collect(),
        )
    }
}

impl TileSource for TemplateSource {
    fn url(&self, coord: TileCoord) -> String {
        let index = if self.templates.len() > 1 {
            (coord.mirror_hash() % self.templates.len() as u64) as usize
        } else {
            0
        };
        self.templates[index]
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string())
    }
}
