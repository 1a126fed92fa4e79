use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::PackageType;
use crate::error::ReplayError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetInfo {
    #[serde(default)]
    pub pnc_base_url: String,
    pub build_id: String,
    #[serde(default)]
    pub build_type: String,
    #[serde(default)]
    pub temporary_build: bool,
}

impl DatasetInfo {
    pub fn package_type(&self) -> PackageType {
        PackageType::from_build_type(&self.build_type)
    }

    pub fn da_group(&self) -> &'static str {
        if self.temporary_build {
            "DA-temporary-builds"
        } else {
            "DA"
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub temporary_build: bool,
    pub build_type: String,
}

pub fn parse_build_summary(build_json: &Value) -> BuildSummary {
    let temporary_build = build_json
        .get("temporaryBuild")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let build_type = build_json
        .get("buildConfigRevision")
        .and_then(|revision| revision.get("buildType"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    BuildSummary {
        temporary_build,
        build_type,
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vertex {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub cost: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DependencyGraph {
    #[serde(default)]
    pub vertices: BTreeMap<String, Vertex>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl DependencyGraph {
    pub fn vertex_build_type(&self, build_id: &str) -> Option<String> {
        let vertex = self.vertices.get(build_id)?;
        let summary = parse_build_summary(&vertex.data);
        (!summary.build_type.is_empty()).then_some(summary.build_type)
    }

    pub fn first_build_type(&self) -> Option<String> {
        self.vertices
            .keys()
            .find_map(|build_id| self.vertex_build_type(build_id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStage {
    pub stage: usize,
    pub builds: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildQueue {
    pub stages: Vec<QueueStage>,
}

impl BuildQueue {
    pub fn from_graph(graph: &DependencyGraph) -> Result<Self, ReplayError> {
        let mut pending: BTreeMap<&str, BTreeSet<&str>> = graph
            .vertices
            .keys()
            .map(|id| (id.as_str(), BTreeSet::new()))
            .collect();
        for edge in &graph.edges {
            pending.entry(edge.target.as_str()).or_default();
            pending
                .entry(edge.source.as_str())
                .or_default()
                .insert(edge.target.as_str());
        }

        let mut stages = Vec::new();
        while !pending.is_empty() {
            let ready = pending
                .iter()
                .filter(|(_, deps)| deps.is_empty())
                .map(|(id, _)| *id)
                .collect::<Vec<_>>();
            if ready.is_empty() {
                let remaining = pending.keys().copied().collect::<Vec<_>>().join(", ");
                return Err(ReplayError::DependencyCycle(remaining));
            }
            for id in &ready {
                pending.remove(id);
            }
            for deps in pending.values_mut() {
                for id in &ready {
                    deps.remove(id);
                }
            }
            stages.push(QueueStage {
                stage: stages.len(),
                builds: ready.into_iter().map(str::to_string).collect(),
            });
        }
        Ok(Self { stages })
    }

    pub fn to_yaml(&self) -> Result<String, ReplayError> {
        serde_yaml::to_string(self).map_err(|err| ReplayError::Filesystem(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn edge(source: &str, target: &str) -> Edge {
        Edge {
            source: source.to_string(),
            target: target.to_string(),
            cost: None,
        }
    }

    #[test]
    fn summary_from_build_json() {
        let json = serde_json::json!({
            "id": "AMJMVSDA5EAAA",
            "temporaryBuild": true,
            "buildConfigRevision": { "buildType": "NPM" }
        });
        let summary = parse_build_summary(&json);
        assert!(summary.temporary_build);
        assert_eq!(summary.build_type, "NPM");
    }

    #[test]
    fn queue_orders_dependencies_first() {
        let graph = DependencyGraph {
            vertices: ["A", "B", "C", "D"]
                .into_iter()
                .map(|id| (id.to_string(), Vertex::default()))
                .collect(),
            edges: vec![edge("A", "B"), edge("B", "C"), edge("D", "C")],
        };
        let queue = BuildQueue::from_graph(&graph).unwrap();
        assert_eq!(
            queue.stages,
            vec![
                QueueStage {
                    stage: 0,
                    builds: vec!["C".to_string()],
                },
                QueueStage {
                    stage: 1,
                    builds: vec!["B".to_string(), "D".to_string()],
                },
                QueueStage {
                    stage: 2,
                    builds: vec!["A".to_string()],
                },
            ]
        );
        assert!(queue.to_yaml().unwrap().contains("stages:"));
    }

    #[test]
    fn queue_rejects_cycles() {
        let graph = DependencyGraph {
            vertices: BTreeMap::new(),
            edges: vec![edge("A", "B"), edge("B", "A")],
        };
        assert_matches!(
            BuildQueue::from_graph(&graph),
            Err(ReplayError::DependencyCycle(_))
        );
    }

    #[test]
    fn member_build_types_come_from_vertex_data() {
        let graph: DependencyGraph = serde_json::from_value(serde_json::json!({
            "vertices": {
                "A": { "name": "A", "data": {} },
                "B": { "name": "B", "data": { "buildConfigRevision": { "buildType": "NPM" } } }
            },
            "edges": []
        }))
        .unwrap();
        assert_eq!(graph.vertex_build_type("A"), None);
        assert_eq!(graph.vertex_build_type("B").as_deref(), Some("NPM"));
        assert_eq!(graph.vertex_build_type("Z"), None);
        assert_eq!(graph.first_build_type().as_deref(), Some("NPM"));
    }

    #[test]
    fn info_da_group() {
        let info = DatasetInfo {
            pnc_base_url: String::new(),
            build_id: "1".to_string(),
            build_type: "MVN".to_string(),
            temporary_build: true,
        };
        assert_eq!(info.da_group(), "DA-temporary-builds");
        assert_eq!(info.package_type(), PackageType::Maven);
    }
}
