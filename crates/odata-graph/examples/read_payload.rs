//! Prints the event stream of a JSON payload read against a demo model.
//!
//! Usage: `read_payload [FILE] [ENTITY_SET]`. Without a file, a built-in
//! payload exercising multi-bound complex navigations is read.

use std::fs;

use odata_graph::{
    Model, ModelBuilder, Multiplicity, PrimitiveKind, ReadEvent, ReaderSettings, Resource,
    ResourceReader, Value,
};

const SERVICE_ROOT: &str = "http://host";

const DEMO_PAYLOAD: &str = r#"{
  "@odata.context": "http://host/$metadata#People/$entity",
  "ID": "alice",
  "Home": {"City": "Lisbon", "Neighbors": [{"ID": "bob"}, {"ID": "carol"}]},
  "Work": {"City": "Porto", "Neighbors": [{"ID": "dave"}]},
  "Badges": [{"ID": 1, "Label": "founder"}]
}"#;

fn demo_model() -> Model {
    ModelBuilder::new()
        .entity_type("Demo.Person", |t| {
            t.key("ID", PrimitiveKind::String)
                .complex_property("Home", "Demo.Address")
                .complex_property("Work", "Demo.Address")
                .contained("Badges", "Demo.Badge", Multiplicity::Many)
        })
        .entity_type("Demo.Badge", |t| {
            t.key("ID", PrimitiveKind::Int32)
                .property("Label", PrimitiveKind::String)
        })
        .complex_type("Demo.Address", |t| {
            t.property("City", PrimitiveKind::String).navigation(
                "Neighbors",
                "Demo.Person",
                Multiplicity::Many,
            )
        })
        .container("Demo")
        .entity_set("People", "Demo.Person")
        .entity_set("HomeNeighbors", "Demo.Person")
        .entity_set("WorkContacts", "Demo.Person")
        .bind("People", "Home/Neighbors", "HomeNeighbors")
        .bind("People", "Work/Neighbors", "WorkContacts")
        .build()
        .expect("demo model is valid")
}

fn format_value(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int32(n) => n.to_string(),
        Value::Int64(n) => format!("{n}L"),
        Value::Double(d) => format!("{d:.6}"),
        Value::String(s) => {
            let preview: String = s.chars().take(60).collect();
            if s.chars().count() > 60 {
                format!("\"{preview}...\"")
            } else {
                format!("\"{preview}\"")
            }
        }
        Value::Guid(g) => g.hyphenated().to_string(),
        Value::Collection(items) => format!("[{} items]", items.len()),
    }
}

fn describe(resource: &Resource) -> String {
    let props: Vec<String> = resource
        .properties
        .iter()
        .map(|p| format!("{}={}", p.name, format_value(&p.value)))
        .collect();
    format!(
        "{} {{{}}}",
        resource.id.as_deref().unwrap_or("(no id)"),
        props.join(", ")
    )
}

fn main() {
    let mut args = std::env::args().skip(1);
    let payload = match args.next() {
        Some(path) => {
            println!("Reading: {path}");
            fs::read_to_string(&path).expect("Failed to read file")
        }
        None => DEMO_PAYLOAD.to_string(),
    };
    let entity_set = args.next().unwrap_or_else(|| "People".to_string());
    println!("Payload size: {} bytes", payload.len());

    let model = demo_model();
    let mut reader = ResourceReader::new(
        &model,
        &entity_set,
        payload,
        ReaderSettings::new(SERVICE_ROOT),
    )
    .expect("Unknown entity set");

    println!("\n=== Events ===");
    let mut depth = 0usize;
    let mut resources = 0usize;
    loop {
        match reader.read() {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                println!("Error at /{}: {e}", reader.path());
                std::process::exit(1);
            }
        }
        let Some(event) = reader.event() else { break };
        let indent = "  ".repeat(depth);
        match event {
            ReadEvent::ResourceStart(_) => depth += 1,
            ReadEvent::ResourceEnd(r) => {
                depth = depth.saturating_sub(1);
                resources += 1;
                println!("{}resource {}", "  ".repeat(depth), describe(r));
            }
            ReadEvent::ResourceSetStart(set) => {
                match set.count {
                    Some(n) => println!("{indent}set (count {n})"),
                    None => println!("{indent}set"),
                }
                depth += 1;
            }
            ReadEvent::ResourceSetEnd(_) => depth = depth.saturating_sub(1),
            ReadEvent::NestedInfoStart(info) => {
                println!("{indent}{}{}", info.name, if info.is_collection { "[]" } else { "" });
                depth += 1;
            }
            ReadEvent::NestedInfoEnd(_) => depth = depth.saturating_sub(1),
            ReadEvent::EndOfInput => break,
        }
    }

    println!("\n=== Summary ===");
    println!("Resources: {resources}");
    if !reader.skipped().is_empty() {
        println!("Skipped members:");
        for pointer in reader.skipped() {
            println!("  - {pointer}");
        }
    }
}
