use std::collections::BTreeSet;
use std::path::Path;

use concord_diff::{
    AdapterRegistry, DiffAdapter, DiffTarget, DocumentMetadataAdapter, LinkCompareMode,
    RelationAdapter, SpanAdapter,
};
use concord_merge::{MergeStrategy, StrategyConfig};
use serde::{Deserialize, Serialize};

use crate::error::{CurationError, CurationResult};

/// How a layer's instances are anchored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    #[default]
    Span,
    Relation,
    Document,
}

/// One link feature of a layer and how its entries are compared.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkFeatureConfig {
    pub feature: String,
    #[serde(default)]
    pub mode: LinkCompareMode,
}

/// One annotation type taking part in curation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// The annotation type name.
    pub name: String,
    #[serde(default)]
    pub kind: LayerKind,
    /// Features whose values decide agreement.
    #[serde(default)]
    pub label_features: BTreeSet<String>,
    /// Whether one annotator may place several instances at one position.
    #[serde(default)]
    pub allow_stacking: bool,
    #[serde(default)]
    pub links: Vec<LinkFeatureConfig>,
}

impl LayerConfig {
    pub fn new(name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            name: name.into(),
            kind,
            label_features: BTreeSet::new(),
            allow_stacking: false,
            links: Vec::new(),
        }
    }

    pub fn with_label(mut self, feature: impl Into<String>) -> Self {
        self.label_features.insert(feature.into());
        self
    }

    pub fn with_link(mut self, feature: impl Into<String>, mode: LinkCompareMode) -> Self {
        self.links.push(LinkFeatureConfig {
            feature: feature.into(),
            mode,
        });
        self
    }

    fn adapter(&self) -> DiffAdapter {
        match self.kind {
            LayerKind::Span => self
                .links
                .iter()
                .fold(SpanAdapter::new(&self.name), |a, l| a.with_link(&l.feature, l.mode))
                .into(),
            LayerKind::Relation => self
                .links
                .iter()
                .fold(RelationAdapter::new(&self.name), |a, l| {
                    a.with_link(&l.feature, l.mode)
                })
                .into(),
            LayerKind::Document => self
                .links
                .iter()
                .fold(DocumentMetadataAdapter::new(&self.name), |a, l| {
                    a.with_link(&l.feature, l.mode)
                })
                .into(),
        }
    }
}

/// Configuration for a curation run, usually loaded from TOML.
///
/// The default configuration is fully manual: no layers, no auto-merge, and
/// a strategy that never merges.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurationConfig {
    /// Whether the merge strategy runs and a merge plan is produced.
    pub auto_merge: bool,
    pub strategy: StrategyConfig,
    pub layers: Vec<LayerConfig>,
}

impl CurationConfig {
    /// Parse and validate a TOML configuration.
    pub fn from_toml_str(input: &str) -> CurationResult<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> CurationResult<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| CurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn to_toml_string(&self) -> CurationResult<String> {
        toml::to_string_pretty(self).map_err(|e| CurationError::Config(e.to_string()))
    }

    /// Reject configurations that cannot be run.
    pub fn validate(&self) -> CurationResult<()> {
        self.strategy.validate()?;

        let mut names = BTreeSet::new();
        for layer in &self.layers {
            if layer.name.trim().is_empty() {
                return Err(CurationError::Config("layer name must not be blank".into()));
            }
            if !names.insert(layer.name.as_str()) {
                return Err(CurationError::Config(format!(
                    "layer '{}' is configured twice",
                    layer.name
                )));
            }
            let mut features = BTreeSet::new();
            for link in &layer.links {
                if !features.insert(link.feature.as_str()) {
                    return Err(CurationError::Config(format!(
                        "link feature '{}' of layer '{}' is configured twice",
                        link.feature, layer.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// One adapter per layer.
    pub fn build_registry(&self) -> CurationResult<AdapterRegistry> {
        let mut registry = AdapterRegistry::new();
        for layer in &self.layers {
            registry.register(layer.adapter())?;
        }
        Ok(registry)
    }

    /// One diff target per layer, in configuration order.
    pub fn diff_targets(&self) -> Vec<DiffTarget> {
        self.layers
            .iter()
            .map(|layer| DiffTarget {
                type_name: layer.name.clone(),
                label_features: layer.label_features.clone(),
                allow_stacking: layer.allow_stacking,
            })
            .collect()
    }

    pub fn build_strategy(&self) -> CurationResult<Box<dyn MergeStrategy>> {
        Ok(self.strategy.build()?)
    }

    /// Hex-encoded BLAKE3 hash of the configuration's JSON form.
    pub fn fingerprint(&self) -> CurationResult<String> {
        let encoded = serde_json::to_vec(self)?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"concord-curation-config-v1:");
        hasher.update(&encoded);
        Ok(hex::encode(hasher.finalize().as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
auto_merge = true

[strategy]
kind = "threshold"
min_annotators = 2
min_confidence = 0.5

[[layers]]
name = "Entity"
kind = "span"
label_features = ["value"]

[[layers]]
name = "Knows"
kind = "relation"

[[layers]]
name = "Pred"
links = [{ feature = "args", mode = "target_as_label" }]

[[layers]]
name = "Meta"
kind = "document"
label_features = ["genre"]
"#;

    #[test]
    fn default_is_manual() {
        let config = CurationConfig::default();
        assert!(!config.auto_merge);
        assert_eq!(config.strategy, StrategyConfig::Manual);
        assert!(config.layers.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn parses_sample() {
        let config = CurationConfig::from_toml_str(SAMPLE).unwrap();
        assert!(config.auto_merge);
        assert_eq!(config.layers.len(), 4);
        assert_eq!(config.layers[2].kind, LayerKind::Span);
        assert_eq!(config.layers[2].links[0].mode, LinkCompareMode::TargetAsLabel);

        let registry = config.build_registry().unwrap();
        assert_eq!(registry.lookup("Knows").unwrap().kind(), "relation");
        assert_eq!(registry.lookup("Meta").unwrap().kind(), "document");
        assert_eq!(registry.lookup("Pred").unwrap().per_entry_links().count(), 1);

        let targets = config.diff_targets();
        assert_eq!(targets[0].type_name, "Entity");
        assert!(targets[0].label_features.contains("value"));
        assert_eq!(config.build_strategy().unwrap().name(), "threshold");
    }

    #[test]
    fn bad_confidence_rejected() {
        let input = "[strategy]\nkind = \"threshold\"\nmin_confidence = 1.5\n";
        assert!(matches!(
            CurationConfig::from_toml_str(input),
            Err(CurationError::Merge(_))
        ));
    }

    #[test]
    fn duplicate_layers_rejected() {
        let config = CurationConfig {
            layers: vec![
                LayerConfig::new("Entity", LayerKind::Span),
                LayerConfig::new("Entity", LayerKind::Relation),
            ],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CurationError::Config(_))));
    }

    #[test]
    fn duplicate_link_features_rejected() {
        let config = CurationConfig {
            layers: vec![LayerConfig::new("Pred", LayerKind::Span)
                .with_link("args", LinkCompareMode::ExactSet)
                .with_link("args", LinkCompareMode::RoleAsLabel)],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_strategy_kind_is_a_parse_error() {
        let input = "[strategy]\nkind = \"coin_flip\"\n";
        assert!(matches!(
            CurationConfig::from_toml_str(input),
            Err(CurationError::Toml(_))
        ));
    }

    #[test]
    fn fingerprint_is_stable_and_sensitive() {
        let a = CurationConfig::from_toml_str(SAMPLE).unwrap();
        let b = CurationConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 64);

        let mut c = a.clone();
        c.auto_merge = false;
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
    }

    #[test]
    fn toml_roundtrip() {
        let config = CurationConfig::from_toml_str(SAMPLE).unwrap();
        let text = config.to_toml_string().unwrap();
        assert_eq!(CurationConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = CurationConfig::from_path(file.path()).unwrap();
        assert_eq!(config.layers.len(), 4);

        let missing = CurationConfig::from_path("/nonexistent/curation.toml");
        assert!(matches!(missing, Err(CurationError::Io { .. })));
    }
}
