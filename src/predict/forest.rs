use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::data::model::{FieldKind, FieldValue, Record};
use crate::error::{LoadError, PredictError};

use super::handle::{ModelSummary, PriceModel};

pub const ARTIFACT_FORMAT: &str = "car-price-forest";
pub const ARTIFACT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// On-disk artifact
// ---------------------------------------------------------------------------

/// JSON document describing a tree ensemble over named record fields.
///
/// ```json
/// {
///   "format": "car-price-forest", "version": 1,
///   "target": "log", "aggregation": "mean", "base_score": 0.0,
///   "features": [{ "name": "Brand", "kind": "categorical", "levels": ["Toyota"] },
///                { "name": "Year", "kind": "integer" }],
///   "trees": [{ "nodes": [
///     { "type": "split", "feature": 1,
///       "rule": { "op": "less_or_equal", "threshold": 2015.5 }, "left": 1, "right": 2 },
///     { "type": "leaf", "value": 1.2 },
///     { "type": "leaf", "value": 1.6 } ] }]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestArtifact {
    pub format: String,
    pub version: u32,
    pub target: TargetTransform,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub base_score: f64,
    pub features: Vec<FeatureDef>,
    pub trees: Vec<TreeDef>,
    #[serde(default)]
    pub metadata: ModelMetadata,
}

/// How the ensemble output relates to a price in natural units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetTransform {
    Identity,
    /// Trained on `ln(price)`.
    Log,
    /// Trained on `ln(1 + price)`.
    Log1p,
}

impl TargetTransform {
    fn invert(self, raw: f64) -> f64 {
        match self {
            TargetTransform::Identity => raw,
            TargetTransform::Log => raw.exp(),
            TargetTransform::Log1p => raw.exp_m1(),
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            TargetTransform::Identity => "Selling Price",
            TargetTransform::Log => "Log of Selling Price",
            TargetTransform::Log1p => "Log(1 + Selling Price)",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Average of tree outputs (random forest).
    #[default]
    Mean,
    /// Sum of tree outputs (additive / boosted ensemble).
    Sum,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureDef {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub levels: Vec<String>,
    #[serde(default)]
    pub unknown: UnknownLevel,
}

/// What to do with a categorical value the model never saw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownLevel {
    #[default]
    Error,
    /// Treat as "not in any level set": every categorical split goes right.
    Ignore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeDef {
    pub nodes: Vec<NodeDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeDef {
    Split {
        feature: usize,
        rule: SplitRuleDef,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SplitRuleDef {
    /// Go left when `value <= threshold`.
    LessOrEqual { threshold: f64 },
    /// Go left when the level is one of `levels`.
    InLevels { levels: Vec<String> },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelMetadata {
    pub algorithm: Option<String>,
    pub metrics: BTreeMap<String, String>,
    pub notes: Vec<String>,
}

// ---------------------------------------------------------------------------
// Compiled model
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Encoding {
    Categorical {
        levels: HashMap<String, u32>,
        unknown: UnknownLevel,
    },
    Integer,
}

impl Encoding {
    fn kind(&self) -> FieldKind {
        match self {
            Encoding::Categorical { .. } => FieldKind::Categorical,
            Encoding::Integer => FieldKind::Integer,
        }
    }
}

#[derive(Debug)]
struct Feature {
    name: String,
    encoding: Encoding,
}

#[derive(Debug)]
enum Rule {
    LessOrEqual(f64),
    InLevels(HashSet<u32>),
}

#[derive(Debug)]
enum Node {
    Split {
        feature: usize,
        rule: Rule,
        left: usize,
        right: usize,
    },
    Leaf(f64),
}

/// Node list in which every child index is greater than its parent's.
#[derive(Debug)]
struct Tree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
enum Encoded {
    /// `None` for an unknown level tolerated by [`UnknownLevel::Ignore`].
    Level(Option<u32>),
    Number(f64),
}

impl Tree {
    fn evaluate(&self, row: &[Encoded]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    rule,
                    left,
                    right,
                } => {
                    let go_left = match (rule, row[*feature]) {
                        (Rule::LessOrEqual(threshold), Encoded::Number(x)) => x <= *threshold,
                        (Rule::InLevels(set), Encoded::Level(Some(level))) => set.contains(&level),
                        _ => false,
                    };
                    idx = if go_left { *left } else { *right };
                }
            }
        }
    }
}

/// A validated tree ensemble ready for inference.
#[derive(Debug)]
pub struct ForestModel {
    features: Vec<Feature>,
    trees: Vec<Tree>,
    target: TargetTransform,
    aggregation: Aggregation,
    base_score: f64,
    metadata: ModelMetadata,
}

impl ForestModel {
    /// Read and validate an artifact file.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|e| LoadError::Deserialization {
            path: path.to_path_buf(),
            reason: format!("{e:#}"),
        })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let artifact: ForestArtifact =
            serde_json::from_str(text).context("parsing model artifact")?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: ForestArtifact) -> Result<Self> {
        if artifact.format != ARTIFACT_FORMAT {
            bail!(
                "unexpected artifact format '{}', expected '{ARTIFACT_FORMAT}'",
                artifact.format
            );
        }
        if artifact.version != ARTIFACT_VERSION {
            bail!("unsupported artifact version {}", artifact.version);
        }
        if !artifact.base_score.is_finite() {
            bail!("base_score must be finite");
        }

        let features = compile_features(&artifact.features)?;
        if artifact.trees.is_empty() {
            bail!("model contains no trees");
        }
        let trees = artifact
            .trees
            .iter()
            .enumerate()
            .map(|(t, tree)| compile_tree(tree, &features).with_context(|| format!("tree {t}")))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            features,
            trees,
            target: artifact.target,
            aggregation: artifact.aggregation,
            base_score: artifact.base_score,
            metadata: artifact.metadata,
        })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    fn encode(&self, record: &Record) -> Result<Vec<Encoded>, PredictError> {
        if let Some((name, _)) = record
            .iter()
            .find(|(name, _)| !self.features.iter().any(|f| f.name == *name))
        {
            return Err(PredictError::Schema(format!(
                "field '{name}' is not a model feature"
            )));
        }

        self.features
            .iter()
            .map(|feature| {
                let value = record.get(&feature.name).ok_or_else(|| {
                    PredictError::Schema(format!("missing feature '{}'", feature.name))
                })?;
                match (&feature.encoding, value) {
                    (Encoding::Categorical { levels, unknown }, FieldValue::Text(s)) => {
                        match (levels.get(s), unknown) {
                            (Some(&level), _) => Ok(Encoded::Level(Some(level))),
                            (None, UnknownLevel::Ignore) => Ok(Encoded::Level(None)),
                            (None, UnknownLevel::Error) => Err(PredictError::Inference(format!(
                                "unknown {} '{s}'",
                                feature.name
                            ))),
                        }
                    }
                    (Encoding::Integer, FieldValue::Integer(i)) => Ok(Encoded::Number(*i as f64)),
                    (encoding, value) => Err(PredictError::Schema(format!(
                        "feature '{}' expects {}, got {}",
                        feature.name,
                        encoding.kind().describe(),
                        value.kind().describe()
                    ))),
                }
            })
            .collect()
    }

    fn predict_one(&self, record: &Record) -> Result<f64, PredictError> {
        let row = self.encode(record)?;
        let total: f64 = self.trees.iter().map(|tree| tree.evaluate(&row)).sum();
        let raw = match self.aggregation {
            Aggregation::Mean => total / self.trees.len() as f64,
            Aggregation::Sum => total,
        } + self.base_score;

        let price = self.target.invert(raw);
        if !price.is_finite() {
            return Err(PredictError::Inference(format!(
                "non-finite prediction (raw output {raw})"
            )));
        }
        Ok(price)
    }
}

impl PriceModel for ForestModel {
    fn predict_batch(&self, records: &[Record]) -> Result<Vec<f64>, PredictError> {
        records.iter().map(|r| self.predict_one(r)).collect()
    }

    fn summary(&self) -> ModelSummary {
        ModelSummary {
            algorithm: self.metadata.algorithm.clone(),
            target: self.target.describe().to_string(),
            feature_names: self.features.iter().map(|f| f.name.clone()).collect(),
            trees: self.trees.len(),
            metrics: self.metadata.metrics.clone(),
            notes: self.metadata.notes.clone(),
        }
    }
}

// -- Validation --

fn compile_features(defs: &[FeatureDef]) -> Result<Vec<Feature>> {
    if defs.is_empty() {
        bail!("model declares no features");
    }
    let mut names = HashSet::new();
    defs.iter()
        .map(|def| {
            if def.name.trim().is_empty() {
                bail!("feature with empty name");
            }
            if !names.insert(def.name.as_str()) {
                bail!("duplicate feature '{}'", def.name);
            }
            let encoding = match def.kind {
                FieldKind::Categorical => {
                    if def.levels.is_empty() {
                        bail!("categorical feature '{}' declares no levels", def.name);
                    }
                    let mut levels = HashMap::with_capacity(def.levels.len());
                    for (idx, level) in def.levels.iter().enumerate() {
                        if levels.insert(level.clone(), idx as u32).is_some() {
                            bail!("feature '{}' repeats level '{level}'", def.name);
                        }
                    }
                    Encoding::Categorical {
                        levels,
                        unknown: def.unknown,
                    }
                }
                FieldKind::Integer => {
                    if !def.levels.is_empty() {
                        bail!("integer feature '{}' cannot declare levels", def.name);
                    }
                    Encoding::Integer
                }
            };
            Ok(Feature {
                name: def.name.clone(),
                encoding,
            })
        })
        .collect()
}

fn compile_tree(def: &TreeDef, features: &[Feature]) -> Result<Tree> {
    if def.nodes.is_empty() {
        bail!("tree has no nodes");
    }
    let len = def.nodes.len();
    let nodes = def
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| {
            compile_node(idx, len, node, features).with_context(|| format!("node {idx}"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Tree { nodes })
}

fn compile_node(idx: usize, len: usize, def: &NodeDef, features: &[Feature]) -> Result<Node> {
    match def {
        NodeDef::Leaf { value } => {
            if !value.is_finite() {
                bail!("leaf value must be finite");
            }
            Ok(Node::Leaf(*value))
        }
        NodeDef::Split {
            feature,
            rule,
            left,
            right,
        } => {
            let target = features
                .get(*feature)
                .with_context(|| format!("feature index {feature} out of range"))?;
            for child in [*left, *right] {
                if child <= idx || child >= len {
                    bail!("child index {child} must be in {}..{len}", idx + 1);
                }
            }
            let rule = match (rule, &target.encoding) {
                (SplitRuleDef::LessOrEqual { threshold }, Encoding::Integer) => {
                    if !threshold.is_finite() {
                        bail!("threshold must be finite");
                    }
                    Rule::LessOrEqual(*threshold)
                }
                (
                    SplitRuleDef::InLevels { levels },
                    Encoding::Categorical { levels: known, .. },
                ) => {
                    let set = levels
                        .iter()
                        .map(|level| {
                            known.get(level).copied().with_context(|| {
                                format!("level '{level}' is not declared by '{}'", target.name)
                            })
                        })
                        .collect::<Result<HashSet<_>>>()?;
                    Rule::InLevels(set)
                }
                (_, encoding) => bail!(
                    "rule does not apply to {} feature '{}'",
                    match encoding.kind() {
                        FieldKind::Categorical => "categorical",
                        FieldKind::Integer => "integer",
                    },
                    target.name
                ),
            };
            Ok(Node::Split {
                feature: *feature,
                rule,
                left: *left,
                right: *right,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::data::model::{BRAND, KILOMETERS, YEAR};
    use crate::predict::handle::{ModelHandle, ModelStore};
    use crate::testing::{sample_artifact, sample_dataset, sample_record};

    fn tiny(target: &str, aggregation: &str, trees: serde_json::Value) -> serde_json::Value {
        json!({
            "format": ARTIFACT_FORMAT,
            "version": ARTIFACT_VERSION,
            "target": target,
            "aggregation": aggregation,
            "features": [
                {"name": "Brand", "kind": "categorical", "levels": ["Toyota", "Honda"]},
                {"name": "Year", "kind": "integer"}
            ],
            "trees": trees
        })
    }

    fn tiny_model(target: &str, aggregation: &str, trees: serde_json::Value) -> ForestModel {
        ForestModel::from_json(&tiny(target, aggregation, trees).to_string()).unwrap()
    }

    fn leaf(value: f64) -> serde_json::Value {
        json!({"nodes": [{"type": "leaf", "value": value}]})
    }

    fn tiny_record(brand: &str, year: i64) -> Record {
        Record::new().with(BRAND, brand).with(YEAR, year)
    }

    fn deserialization_reason(doc: serde_json::Value) -> String {
        let err = ForestModel::from_json(&doc.to_string()).unwrap_err();
        format!("{err:#}")
    }

    #[test]
    fn test_dataset_records_predict_finite_non_negative() {
        let model = ForestModel::from_artifact(sample_artifact()).unwrap();
        let dataset = sample_dataset();
        let records: Vec<Record> = dataset.listings().iter().map(|l| l.record.clone()).collect();

        let prices = model.predict_batch(&records).unwrap();

        assert_eq!(prices.len(), records.len());
        assert!(prices.iter().all(|p| p.is_finite() && *p >= 0.0));
    }

    #[test]
    fn test_log_target_is_inverted() {
        let doc = tiny("log", "mean", json!([leaf(850_000f64.ln())]));
        let model = ForestModel::from_json(&doc.to_string()).unwrap();
        let price = model.predict_batch(&[tiny_record("Toyota", 2018)]).unwrap()[0];
        assert!((price - 850_000.0).abs() < 1e-6 * 850_000.0);
    }

    #[test]
    fn test_mean_and_sum_aggregation() {
        let trees = json!([leaf(2.0), leaf(4.0)]);
        let mean = tiny_model("identity", "mean", trees.clone());
        let sum = tiny_model("identity", "sum", trees);
        let record = tiny_record("Honda", 2012);
        assert_eq!(mean.predict_batch(&[record.clone()]).unwrap(), vec![3.0]);
        assert_eq!(sum.predict_batch(&[record]).unwrap(), vec![6.0]);
    }

    #[test]
    fn test_splits_route_left_on_threshold_and_level() {
        let tree = json!({"nodes": [
            {
                "type": "split",
                "feature": 1,
                "rule": {"op": "less_or_equal", "threshold": 2015.0},
                "left": 1,
                "right": 2
            },
            {"type": "leaf", "value": 1.0},
            {
                "type": "split",
                "feature": 0,
                "rule": {"op": "in_levels", "levels": ["Toyota"]},
                "left": 3,
                "right": 4
            },
            {"type": "leaf", "value": 10.0},
            {"type": "leaf", "value": 5.0}
        ]});
        let model = tiny_model("identity", "mean", json!([tree]));
        let predict = |brand, year| model.predict_batch(&[tiny_record(brand, year)]).unwrap()[0];

        assert_eq!(predict("Toyota", 2015), 1.0);
        assert_eq!(predict("Toyota", 2016), 10.0);
        assert_eq!(predict("Honda", 2016), 5.0);
    }

    #[test]
    fn test_unknown_level_policy() {
        let strict = tiny_model("identity", "mean", json!([leaf(1.0)]));
        let err = strict.predict_batch(&[tiny_record("Tesla", 2018)]).unwrap_err();
        assert!(matches!(err, PredictError::Inference(_)));

        let mut doc = tiny("identity", "mean", json!([leaf(1.0)]));
        doc["features"][0]["unknown"] = json!("ignore");
        let lenient = ForestModel::from_json(&doc.to_string()).unwrap();
        assert_eq!(lenient.predict_batch(&[tiny_record("Tesla", 2018)]).unwrap(), vec![1.0]);
    }

    #[test]
    fn test_schema_mismatches() {
        let model = tiny_model("identity", "mean", json!([leaf(1.0)]));

        let missing = Record::new().with(BRAND, "Toyota");
        let extra = tiny_record("Toyota", 2018).with(KILOMETERS, 10);
        let wrong_kind = Record::new().with(BRAND, "Toyota").with(YEAR, "2018");

        for record in [missing, extra, wrong_kind] {
            let err = model.predict_batch(&[record]).unwrap_err();
            assert!(matches!(err, PredictError::Schema(_)), "{err:?}");
        }
    }

    #[test]
    fn test_overflowing_output_is_inference_error() {
        let model = tiny_model("log", "mean", json!([leaf(1000.0)]));
        let err = model.predict_batch(&[tiny_record("Toyota", 2018)]).unwrap_err();
        assert!(matches!(err, PredictError::Inference(_)));
    }

    #[test]
    fn test_rejects_malformed_artifacts() {
        assert!(ForestModel::from_json("not json").is_err());

        let mut wrong_format = tiny("log", "mean", json!([leaf(1.0)]));
        wrong_format["format"] = json!("sklearn-pickle");
        assert!(deserialization_reason(wrong_format).contains("format"));

        let no_trees = tiny("log", "mean", json!([]));
        assert!(deserialization_reason(no_trees).contains("no trees"));

        let backwards = json!([{"nodes": [
            {
                "type": "split",
                "feature": 1,
                "rule": {"op": "less_or_equal", "threshold": 1.0},
                "left": 0,
                "right": 1
            },
            {"type": "leaf", "value": 1.0}
        ]}]);
        assert!(deserialization_reason(tiny("log", "mean", backwards)).contains("child index"));

        let bad_feature = json!([{"nodes": [
            {
                "type": "split",
                "feature": 9,
                "rule": {"op": "less_or_equal", "threshold": 1.0},
                "left": 1,
                "right": 2
            },
            {"type": "leaf", "value": 1.0},
            {"type": "leaf", "value": 2.0}
        ]}]);
        assert!(deserialization_reason(tiny("log", "mean", bad_feature)).contains("out of range"));

        let wrong_rule = json!([{"nodes": [
            {
                "type": "split",
                "feature": 0,
                "rule": {"op": "less_or_equal", "threshold": 1.0},
                "left": 1,
                "right": 2
            },
            {"type": "leaf", "value": 1.0},
            {"type": "leaf", "value": 2.0}
        ]}]);
        assert!(deserialization_reason(tiny("log", "mean", wrong_rule)).contains("categorical"));

        let undeclared = json!([{"nodes": [
            {
                "type": "split",
                "feature": 0,
                "rule": {"op": "in_levels", "levels": ["Tesla"]},
                "left": 1,
                "right": 2
            },
            {"type": "leaf", "value": 1.0},
            {"type": "leaf", "value": 2.0}
        ]}]);
        assert!(deserialization_reason(tiny("log", "mean", undeclared)).contains("Tesla"));
    }

    #[test]
    fn test_store_loads_artifact_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("carsell_model.json");
        fs::write(&path, serde_json::to_string(&sample_artifact()).unwrap()).unwrap();

        let mut store = ModelStore::default();
        let handle = store.load(&path).unwrap();
        fs::write(&path, "corrupted").unwrap();
        let again = store.load(&path).unwrap();

        assert!(handle.predict(&sample_record()).unwrap() > 0.0);
        assert_eq!(handle.summary(), again.summary());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_corrupt_file_is_deserialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, "{\"format\": 3}").unwrap();
        let err = ForestModel::load(&path).unwrap_err();
        assert!(matches!(err, LoadError::Deserialization { .. }));
    }

    #[test]
    fn test_summary_reports_metadata() {
        let model = ForestModel::from_artifact(sample_artifact()).unwrap();
        let handle = ModelHandle::new(Arc::new(model));
        let summary = handle.summary();
        assert_eq!(summary.target, "Log of Selling Price");
        assert_eq!(summary.feature_names.len(), 11);
        assert_eq!(summary.algorithm.as_deref(), Some("Random Forest Regressor"));
    }
}
