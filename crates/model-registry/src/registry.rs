//! Registry of built-in style models

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::{ModelConfig, SourceFormat, StyleCategory, TensorLayout};
use crate::normalization::{IMAGENET_MEAN, IMAGENET_STD, SYMMETRIC_MEAN_STD};
use crate::RegistryError;

/// Immutable lookup table from style identifier to model metadata
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelConfig>,
}

impl ModelRegistry {
    /// Registry containing the built-in styles
    pub fn builtin() -> Self {
        let models = builtin_configs()
            .into_iter()
            .map(|config| (config.id.clone(), config))
            .collect::<BTreeMap<_, _>>();
        info!("Model registry initialized with {} styles", models.len());
        Self { models }
    }

    /// Build a registry from explicit configs, validating each one
    pub fn from_configs(
        configs: impl IntoIterator<Item = ModelConfig>,
    ) -> Result<Self, RegistryError> {
        let mut models = BTreeMap::new();
        for config in configs {
            config.validate()?;
            if models.contains_key(&config.id) {
                return Err(RegistryError::DuplicateStyle(config.id));
            }
            debug!("Registering style {} ({})", config.id, config.file);
            models.insert(config.id.clone(), config);
        }
        Ok(Self { models })
    }

    /// Look up a style
    pub fn get(&self, id: &str) -> Option<&ModelConfig> {
        self.models.get(id)
    }

    /// Look up a style, failing on unknown identifiers
    pub fn lookup(&self, id: &str) -> Result<&ModelConfig, RegistryError> {
        self.get(id)
            .ok_or_else(|| RegistryError::UnknownStyle(id.to_string()))
    }

    /// Registered identifiers in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelConfig> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_configs() -> Vec<ModelConfig> {
    let symmetric = [SYMMETRIC_MEAN_STD; 3];

    vec![
        ModelConfig {
            id: "starry-night".to_string(),
            display_name: "Starry Night".to_string(),
            category: StyleCategory::Painterly,
            file: "starry_night.onnx".to_string(),
            input_shape: [1, 256, 256, 3],
            input_layout: TensorLayout::Nhwc,
            mean: symmetric,
            std: symmetric,
            max_input_edge: 1024,
            accepted_formats: SourceFormat::common(),
        },
        ModelConfig {
            id: "mosaic".to_string(),
            display_name: "Mosaic".to_string(),
            category: StyleCategory::Painterly,
            file: "mosaic-9.onnx".to_string(),
            input_shape: [1, 224, 224, 3],
            input_layout: TensorLayout::Nchw,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
            max_input_edge: 1024,
            accepted_formats: SourceFormat::common(),
        },
        ModelConfig {
            id: "candy".to_string(),
            display_name: "Candy".to_string(),
            category: StyleCategory::Painterly,
            file: "candy-9.onnx".to_string(),
            input_shape: [1, 224, 224, 3],
            input_layout: TensorLayout::Nchw,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
            max_input_edge: 1024,
            accepted_formats: SourceFormat::common(),
        },
        ModelConfig {
            id: "pencil-sketch".to_string(),
            display_name: "Pencil Sketch".to_string(),
            category: StyleCategory::Sketch,
            file: "pencil_sketch.onnx".to_string(),
            input_shape: [1, 256, 256, 3],
            input_layout: TensorLayout::Nhwc,
            mean: symmetric,
            std: symmetric,
            max_input_edge: 1024,
            accepted_formats: vec![SourceFormat::Png, SourceFormat::Jpeg],
        },
        ModelConfig {
            id: "anime".to_string(),
            display_name: "Anime".to_string(),
            category: StyleCategory::Anime,
            file: "animegan_v2.onnx".to_string(),
            input_shape: [1, 512, 512, 3],
            input_layout: TensorLayout::Nhwc,
            mean: symmetric,
            std: symmetric,
            max_input_edge: 1024,
            accepted_formats: SourceFormat::common(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NormalizationScheme;

    #[test]
    fn test_builtin_configs_are_valid() {
        let registry = ModelRegistry::from_configs(builtin_configs()).unwrap();
        assert_eq!(registry.len(), ModelRegistry::builtin().len());
    }

    #[test]
    fn test_lookup() {
        let registry = ModelRegistry::builtin();
        let config = registry.lookup("starry-night").unwrap();
        assert_eq!(config.display_name, "Starry Night");
        assert_eq!(config.normalization(), NormalizationScheme::Symmetric);

        let mosaic = registry.lookup("mosaic").unwrap();
        assert_eq!(mosaic.normalization(), NormalizationScheme::imagenet());
    }

    #[test]
    fn test_unknown_style() {
        let registry = ModelRegistry::builtin();
        assert_eq!(
            registry.lookup("cubism").unwrap_err(),
            RegistryError::UnknownStyle("cubism".to_string())
        );
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut configs = builtin_configs();
        configs.push(configs[0].clone());
        assert!(matches!(
            ModelRegistry::from_configs(configs),
            Err(RegistryError::DuplicateStyle(id)) if id == "starry-night"
        ));
    }

    #[test]
    fn test_ids_sorted() {
        let registry = ModelRegistry::builtin();
        let ids: Vec<_> = registry.ids().collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert!(ids.contains(&"anime"));
    }
}
