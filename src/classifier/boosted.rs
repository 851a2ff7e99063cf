use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;

use crate::outline::FeatureColumn;

use super::{CLASS_COUNT, LevelModel};

#[derive(Debug, Deserialize)]
struct BoosterDump {
    #[serde(default = "default_num_class")]
    num_class: usize,
    #[serde(default = "default_base_score")]
    base_score: f64,
    trees: Vec<DumpNode>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DumpNode {
    Split {
        nodeid: usize,
        split: String,
        split_condition: f64,
        yes: usize,
        no: usize,
        missing: usize,
        children: Vec<DumpNode>,
    },
    Leaf {
        nodeid: usize,
        leaf: f64,
    },
}

fn default_num_class() -> usize {
    CLASS_COUNT
}

fn default_base_score() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        yes: usize,
        no: usize,
        missing: usize,
    },
    Leaf(f64),
}

#[derive(Debug, Clone, PartialEq)]
struct Tree {
    nodes: Vec<Option<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoostedTrees {
    num_class: usize,
    base_score: f64,
    feature_count: usize,
    trees: Vec<Tree>,
}

impl BoostedTrees {
    pub fn from_value(value: Value, columns: &[FeatureColumn]) -> Result<Self> {
        let dump: BoosterDump =
            serde_json::from_value(value).context("failed to parse boosted tree dump")?;

        if dump.num_class != CLASS_COUNT {
            bail!(
                "booster has {} classes, expected {}",
                dump.num_class,
                CLASS_COUNT
            );
        }
        if dump.trees.is_empty() {
            bail!("booster contains no trees");
        }

        let trees = dump
            .trees
            .into_iter()
            .enumerate()
            .map(|(index, root)| {
                compile_tree(root, columns).with_context(|| format!("malformed tree {index}"))
            })
            .collect::<Result<Vec<Tree>>>()?;

        Ok(Self {
            num_class: dump.num_class,
            base_score: dump.base_score,
            feature_count: columns.len(),
            trees,
        })
    }

    pub fn margins(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.feature_count {
            bail!(
                "expected {} features, received {}",
                self.feature_count,
                features.len()
            );
        }

        let mut margins = vec![self.base_score; self.num_class];
        for (index, tree) in self.trees.iter().enumerate() {
            margins[index % self.num_class] += tree.evaluate(features)?;
        }
        Ok(margins)
    }
}

impl LevelModel for BoostedTrees {
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        Ok(softmax(&self.margins(features)?))
    }
}

impl Tree {
    fn evaluate(&self, features: &[f64]) -> Result<f64> {
        let mut current = 0;
        for _ in 0..=self.nodes.len() {
            let node = self
                .nodes
                .get(current)
                .and_then(Option::as_ref)
                .with_context(|| format!("tree references missing node {current}"))?;

            match node {
                Node::Leaf(value) => return Ok(*value),
                Node::Split {
                    feature,
                    threshold,
                    yes,
                    no,
                    missing,
                } => {
                    let value = features[*feature];
                    current = if value.is_nan() {
                        *missing
                    } else if value < *threshold {
                        *yes
                    } else {
                        *no
                    };
                }
            }
        }

        bail!("tree traversal did not reach a leaf")
    }
}

fn compile_tree(root: DumpNode, columns: &[FeatureColumn]) -> Result<Tree> {
    let mut nodes = Vec::<Option<Node>>::new();
    let mut pending = vec![root];

    while let Some(node) = pending.pop() {
        let (id, compiled) = match node {
            DumpNode::Leaf { nodeid, leaf } => (nodeid, Node::Leaf(leaf)),
            DumpNode::Split {
                nodeid,
                split,
                split_condition,
                yes,
                no,
                missing,
                children,
            } => {
                pending.extend(children);
                let feature = resolve_feature(&split, columns)?;
                (
                    nodeid,
                    Node::Split {
                        feature,
                        threshold: split_condition,
                        yes,
                        no,
                        missing,
                    },
                )
            }
        };

        if nodes.len() <= id {
            nodes.resize(id + 1, None);
        }
        if nodes[id].is_some() {
            bail!("duplicate node id {id}");
        }
        nodes[id] = Some(compiled);
    }

    for node in nodes.iter().flatten() {
        if let Node::Split { yes, no, missing, .. } = node {
            for target in [yes, no, missing] {
                if nodes.get(*target).is_none_or(Option::is_none) {
                    bail!("split references missing node {target}");
                }
            }
        }
    }

    Ok(Tree { nodes })
}

fn resolve_feature(split: &str, columns: &[FeatureColumn]) -> Result<usize> {
    if let Some(index) = columns.iter().position(|column| column.as_str() == split) {
        return Ok(index);
    }

    let index = split
        .strip_prefix('f')
        .and_then(|digits| digits.parse::<usize>().ok())
        .with_context(|| format!("unknown split feature: {split}"))?;
    if index >= columns.len() {
        bail!("split feature {split} is out of range for {} columns", columns.len());
    }
    Ok(index)
}

pub(super) fn softmax(margins: &[f64]) -> Vec<f64> {
    let max = margins.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps = margins.iter().map(|margin| (margin - max).exp()).collect::<Vec<f64>>();
    let total = exps.iter().sum::<f64>();
    exps.iter().map(|value| value / total).collect()
}
