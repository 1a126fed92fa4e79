use indy_replay::dataset::{BuildQueue, DependencyGraph};

#[test]
fn queue_from_pnc_graph_json() {
    let graph: DependencyGraph = serde_json::from_str(
        r#"{
            "vertices": {
                "AMJMVSDA5EAAA": {"name": "AMJMVSDA5EAAA", "dataType": "Build", "data": {"id": "AMJMVSDA5EAAA"}},
                "AMJMVSDA5EAAB": {"name": "AMJMVSDA5EAAB", "dataType": "Build", "data": {}},
                "AMJMVSDA5EAAC": {"name": "AMJMVSDA5EAAC", "dataType": "Build", "data": {}}
            },
            "edges": [
                {"source": "AMJMVSDA5EAAA", "target": "AMJMVSDA5EAAB", "cost": 1},
                {"source": "AMJMVSDA5EAAA", "target": "AMJMVSDA5EAAC", "cost": 1}
            ]
        }"#,
    )
    .unwrap();

    let queue = BuildQueue::from_graph(&graph).unwrap();
    assert_eq!(queue.stages.len(), 2);
    assert_eq!(queue.stages[0].builds, vec!["AMJMVSDA5EAAB", "AMJMVSDA5EAAC"]);
    assert_eq!(queue.stages[1].builds, vec!["AMJMVSDA5EAAA"]);

    let yaml = queue.to_yaml().unwrap();
    let parsed: BuildQueue = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed, queue);
}

#[test]
fn empty_graph_has_no_stages() {
    let graph: DependencyGraph = serde_json::from_str("{}").unwrap();
    assert!(BuildQueue::from_graph(&graph).unwrap().stages.is_empty());
}
