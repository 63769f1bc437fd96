//! End-to-end scenario (spec §8, "Pipeline bifurcation"): one source stage
//! feeds two independent junctions — an indented JSON rendering and a
//! single-line rendering that is itself further converted to bytes — and
//! both outputs are present in the harness's result, neither evicting the
//! other.
use std::any::Any;
use std::collections::HashMap;
use treeforge::pipeline::{Junction, JunctionPipeline};
use treeforge::{Code, Node, RootNode};

fn downcast<'a, T: 'static>(data: &'a Option<Box<dyn Any>>) -> &'a T {
    data.as_ref().unwrap().downcast_ref::<T>().unwrap()
}

#[test]
fn bifurcated_junctions_both_survive_in_the_harness_output() {
    let mut source: HashMap<String, f64> = HashMap::new();
    source.insert("pi".to_string(), 3.1415);

    let mut start = RootNode::new(Node::leaf("dict", ""), Code::new(String::new()), "dict");
    start.data = Some(Box::new(source));

    let junctions = vec![
        Junction::new(
            "dict",
            "indented",
            Box::new(|r: &RootNode| {
                let map: &HashMap<String, f64> = downcast(&r.data);
                let json = serde_json::to_string_pretty(map).unwrap();
                let mut out =
                    RootNode::new(Node::leaf("indented", json.clone()), Code::new(String::new()), "indented");
                out.data = Some(Box::new(json));
                Ok(out)
            }),
        ),
        Junction::new(
            "dict",
            "line",
            Box::new(|r: &RootNode| {
                let map: &HashMap<String, f64> = downcast(&r.data);
                let json = serde_json::to_string(map).unwrap();
                let mut out =
                    RootNode::new(Node::leaf("line", json.clone()), Code::new(String::new()), "line");
                out.data = Some(Box::new(json));
                Ok(out)
            }),
        ),
        Junction::new(
            "line",
            "bytes",
            Box::new(|r: &RootNode| {
                let json: &String = downcast(&r.data);
                let bytes = json.as_bytes().to_vec();
                let mut out = RootNode::new(Node::leaf("bytes", ""), Code::new(String::new()), "bytes");
                out.data = Some(Box::new(bytes));
                Ok(out)
            }),
        ),
    ];

    let pipeline = JunctionPipeline::new(junctions).unwrap();
    let outputs = pipeline.run(start, "dict").unwrap();

    assert_eq!(outputs.len(), 4);

    let indented: &String = downcast(&outputs["indented"].data);
    assert!(indented.contains('\n'), "pretty rendering should be multi-line");

    let line: &String = downcast(&outputs["line"].data);
    assert!(!line.contains('\n'), "single-line rendering should have no newlines");

    let bytes: &Vec<u8> = downcast(&outputs["bytes"].data);
    assert_eq!(bytes, &line.as_bytes().to_vec());
}
