//! Benchmark for writing and reading a multi-bound feed.
//!
//! Builds a synthetic feed of people whose `Home` and `Work` addresses
//! navigate to people bound to different entity sets, then measures write,
//! parse and read throughput at each metadata level.

use std::time::{Duration, Instant};

use odata_graph::{
    MetadataLevel, Model, ModelBuilder, Multiplicity, NestedResourceInfo, PayloadKind,
    PrimitiveKind, ReadEvent, ReaderSettings, Resource, ResourceReader, ResourceSet,
    ResourceWriter, WriterSettings,
};
use uuid::Uuid;

const SERVICE_ROOT: &str = "http://bench.local/service";

// =============================================================================
// MODEL AND DATA
// =============================================================================

fn bench_model() -> Model {
    ModelBuilder::new()
        .entity_type("Bench.Person", |t| {
            t.key("ID", PrimitiveKind::Guid)
                .required_property("Name", PrimitiveKind::String)
                .property("Score", PrimitiveKind::Double)
                .complex_property("Home", "Bench.Address")
                .complex_property("Work", "Bench.Address")
                .contained("Visits", "Bench.Visit", Multiplicity::Many)
        })
        .entity_type("Bench.Employee", |t| {
            t.base("Bench.Person")
                .navigation("Manager", "Bench.Person", Multiplicity::ZeroOrOne)
        })
        .entity_type("Bench.Visit", |t| {
            t.key("Seq", PrimitiveKind::Int64)
                .collection_property("Tags", PrimitiveKind::String)
        })
        .complex_type("Bench.Address", |t| {
            t.property("City", PrimitiveKind::String).navigation(
                "Neighbors",
                "Bench.Person",
                Multiplicity::Many,
            )
        })
        .container("Bench")
        .entity_set("People", "Bench.Person")
        .entity_set("Neighbors", "Bench.Person")
        .entity_set("Colleagues", "Bench.Person")
        .entity_set("Managers", "Bench.Person")
        .bind("People", "Home/Neighbors", "Neighbors")
        .bind("People", "Work/Neighbors", "Colleagues")
        .bind("People", "Bench.Employee/Manager", "Managers")
        .build()
        .expect("bench model is valid")
}

struct Person {
    id: Uuid,
    name: String,
    score: f64,
    employee: bool,
    home: Vec<Uuid>,
    work: Vec<Uuid>,
    visits: i64,
}

fn generate_people(count: usize) -> Vec<Person> {
    (0..count)
        .map(|i| Person {
            id: Uuid::new_v4(),
            name: format!("person-{i}"),
            score: i as f64 * 0.5,
            employee: i % 3 == 0,
            home: (0..i % 4).map(|_| Uuid::new_v4()).collect(),
            work: (0..i % 3).map(|_| Uuid::new_v4()).collect(),
            visits: (i % 5) as i64,
        })
        .collect()
}

fn person_resource(p: &Person) -> Resource {
    let mut r = Resource::new()
        .property("ID", p.id)
        .property("Name", p.name.as_str())
        .property("Score", p.score);
    if p.employee {
        r = r.with_type("Bench.Employee");
    }
    r
}

// =============================================================================
// WRITE / READ
// =============================================================================

fn write_feed(
    model: &Model,
    people: &[Person],
    metadata: MetadataLevel,
) -> Result<Vec<u8>, odata_graph::WriteError> {
    let settings = WriterSettings::new(SERVICE_ROOT).with_metadata(metadata);
    let mut w = ResourceWriter::new(model, "People", Vec::new(), settings)?;
    w.start_resource_set(&ResourceSet {
        count: Some(people.len() as i64),
    })?;
    for p in people {
        w.start_resource(&person_resource(p))?;
        for (name, neighbors) in [("Home", &p.home), ("Work", &p.work)] {
            w.start_nested_info(&NestedResourceInfo::single(name))?;
            w.start_resource(&Resource::new().property("City", name))?;
            w.start_nested_info(&NestedResourceInfo::collection("Neighbors"))?;
            w.start_resource_set(&ResourceSet::new())?;
            for id in neighbors {
                w.start_resource(&Resource::new().property("ID", *id).property("Name", "n"))?;
                w.end_resource()?;
            }
            w.end_resource_set()?;
            w.end_nested_info()?;
            w.end_resource()?;
            w.end_nested_info()?;
        }
        if p.employee {
            w.start_nested_info(&NestedResourceInfo::single("Manager"))?;
            w.start_resource(&Resource::new().property("ID", Uuid::nil()).property("Name", "boss"))?;
            w.end_resource()?;
            w.end_nested_info()?;
        }
        w.start_nested_info(&NestedResourceInfo::collection("Visits"))?;
        w.start_resource_set(&ResourceSet::new())?;
        for seq in 0..p.visits {
            w.start_resource(
                &Resource::new()
                    .property("Seq", seq)
                    .property("Tags", odata_graph::Value::Collection(vec!["a".into(), "b".into()])),
            )?;
            w.end_resource()?;
        }
        w.end_resource_set()?;
        w.end_nested_info()?;
        w.end_resource()?;
    }
    w.end_resource_set()?;
    w.into_inner()
}

#[derive(Default)]
struct ReadStats {
    resources: usize,
    identified: usize,
    per_set: [usize; 4],
}

fn read_feed(model: &Model, payload: String) -> Result<ReadStats, odata_graph::ReadError> {
    let settings = ReaderSettings::new(SERVICE_ROOT).with_payload(PayloadKind::ResourceSet);
    let reader = ResourceReader::new(model, "People", payload, settings)?;
    let mut stats = ReadStats::default();
    for event in reader {
        if let ReadEvent::ResourceEnd(r) = event? {
            stats.resources += 1;
            let Some(id) = r.id else { continue };
            stats.identified += 1;
            let rest = id.strip_prefix(SERVICE_ROOT).unwrap_or(&id);
            for (i, set) in ["/People(", "/Neighbors(", "/Colleagues(", "/Managers("]
                .iter()
                .enumerate()
            {
                if rest.starts_with(set) && !rest.contains("/Visits(") {
                    stats.per_set[i] += 1;
                }
            }
        }
    }
    Ok(stats)
}

fn throughput(bytes: usize, elapsed: Duration) -> f64 {
    (bytes as f64 / 1_000_000.0) / elapsed.as_secs_f64()
}

fn main() {
    let count: usize = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(20_000);

    let model = bench_model();

    let gen_start = Instant::now();
    let people = generate_people(count);
    println!("Generated {} people in {:?}", people.len(), gen_start.elapsed());

    for (label, metadata) in [
        ("none", MetadataLevel::None),
        ("minimal", MetadataLevel::Minimal),
        ("full", MetadataLevel::Full),
    ] {
        let write_start = Instant::now();
        let payload = write_feed(&model, &people, metadata).expect("Failed to write feed");
        let write_time = write_start.elapsed();

        println!("\nMetadata {label}: {} bytes written in {:?}", payload.len(), write_time);
        println!("  Write throughput: {:.2} MB/s", throughput(payload.len(), write_time));

        // Baseline: untyped parse of the same document
        let parse_start = Instant::now();
        let parsed: serde_json::Value =
            serde_json::from_slice(&payload).expect("Writer produced invalid JSON");
        let parse_time = parse_start.elapsed();
        assert_eq!(parsed["value"].as_array().map(Vec::len), Some(people.len()));
        println!("  serde_json parse: {:?}", parse_time);

        let len = payload.len();
        let text = String::from_utf8(payload).expect("Writer produced invalid UTF-8");
        let read_start = Instant::now();
        let stats = read_feed(&model, text).expect("Failed to read feed");
        let read_time = read_start.elapsed();

        println!(
            "  Read {} resources ({} identified) in {:?}",
            stats.resources, stats.identified, read_time
        );
        println!("  Read throughput: {:.2} MB/s", throughput(len, read_time));
        println!(
            "  By set: People={} Neighbors={} Colleagues={} Managers={}",
            stats.per_set[0], stats.per_set[1], stats.per_set[2], stats.per_set[3]
        );
        assert_eq!(stats.per_set[0], people.len());
        assert_eq!(
            stats.per_set[1],
            people.iter().map(|p| p.home.len()).sum::<usize>()
        );
        assert_eq!(
            stats.per_set[2],
            people.iter().map(|p| p.work.len()).sum::<usize>()
        );
    }
}
