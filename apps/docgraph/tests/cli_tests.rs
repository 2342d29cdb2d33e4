//! CLI command tests against a temporary redb store.

use clap::Parser;
use docgraph::cli::{Cli, Commands, execute, parse_value};
use docgraph_core::{Direction, GraphError};
use serde_json::{Value, json};
use std::path::Path;
use tempfile::tempdir;

fn run(db: &Path, args: &[&str]) -> Result<Value, GraphError> {
    let mut argv = vec!["docgraph", "-D", db.to_str().expect("utf-8 path")];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).expect("valid arguments");
    execute(&cli)
}

fn family(db: &Path) {
    for id in ["bart", "homer", "marge"] {
        run(db, &["add-vertex", "--id", id]).expect("add vertex");
    }
    run(db, &["add-edge", "--from", "bart", "--to", "homer", "-l", "son of"]).expect("edge");
    run(db, &["add-edge", "--from", "bart", "--to", "marge", "-l", "son of"]).expect("edge");
    run(db, &["add-edge", "--from", "homer", "--to", "marge", "-l", "married to"]).expect("edge");
}

#[test]
fn parse_direction_and_labels() {
    let cli = Cli::try_parse_from([
        "docgraph", "neighbors", "--vertex", "a", "-d", "IN", "-l", "x", "-l", "y",
    ])
    .expect("parse");
    let Some(Commands::Neighbors {
        vertex,
        direction,
        label,
    }) = cli.command
    else {
        unreachable!("expected the neighbors command");
    };
    assert_eq!(vertex, "a");
    assert_eq!(direction, Direction::In);
    assert_eq!(label, ["x", "y"]);
}

#[test]
fn property_target_is_exclusive() {
    let both = Cli::try_parse_from([
        "docgraph", "set-prop", "--vertex", "a", "--edge", "b", "-k", "x", "--value", "1",
    ]);
    assert!(both.is_err());

    let neither = Cli::try_parse_from(["docgraph", "set-prop", "-k", "x", "--value", "1"]);
    assert!(neither.is_err());
}

#[test]
fn values_parse_as_json_or_string() {
    assert_eq!(parse_value("42"), json!(42));
    assert_eq!(parse_value("[1,2]"), json!([1, 2]));
    assert_eq!(parse_value("true"), json!(true));
    assert_eq!(parse_value("bart"), json!("bart"));
}

#[test]
fn init_and_status() {
    let temp = tempdir().expect("temp dir");
    let db = temp.path().join("graph.redb");

    let init = run(&db, &["init"]).expect("init");
    assert_eq!(init["persistent"], json!(true));
    assert!(db.exists());

    family(&db);
    let status = run(&db, &["status"]).expect("status");
    assert_eq!(status["vertices"], json!(3));
    assert_eq!(status["edges"], json!(3));
    assert_eq!(status["labels"], json!(["married to", "son of"]));
}

#[test]
fn traversal_commands() {
    let temp = tempdir().expect("temp dir");
    let db = temp.path().join("graph.redb");
    family(&db);

    let parents = run(&db, &["neighbors", "--vertex", "bart", "-d", "out", "-l", "son of"])
        .expect("neighbors");
    assert_eq!(parents["neighbors"], json!(["homer", "marge"]));

    let marge = run(&db, &["neighbors", "--vertex", "marge", "-d", "in"]).expect("neighbors");
    let mut ids: Vec<String> = serde_json::from_value(marge["neighbors"].clone()).expect("ids");
    ids.sort();
    assert_eq!(ids, ["bart", "homer"]);

    let edges = run(&db, &["edges", "--vertex", "homer"]).expect("edges");
    assert_eq!(edges["edges"].as_array().expect("array").len(), 2);
}

#[test]
fn properties_and_lookup() {
    let temp = tempdir().expect("temp dir");
    let db = temp.path().join("graph.redb");
    family(&db);

    run(&db, &["set-prop", "--vertex", "bart", "-k", "age", "--value", "10"]).expect("set");
    run(&db, &["set-prop", "--edge", "bart->|son of|->homer", "-k", "since", "--value", "1989"])
        .expect("set edge prop");

    let shown = run(&db, &["show", "--vertex", "bart"]).expect("show");
    assert_eq!(shown["props"], json!({"age": 10}));
    assert_eq!(
        shown["edges"]["out"]["son of"],
        json!(["e_bart->|son of|->homer", "e_bart->|son of|->marge"])
    );

    let found = run(&db, &["find", "-k", "age", "--value", "10"]).expect("find");
    assert_eq!(found, json!(["bart"]));

    let found = run(&db, &["find", "-k", "since", "--value", "1989", "--edges"]).expect("find");
    assert_eq!(found[0]["id"], json!("bart->|son of|->homer"));

    let unset = run(&db, &["unset-prop", "--vertex", "bart", "-k", "age"]).expect("unset");
    assert_eq!(unset["removed"], json!(10));
}

#[test]
fn removal_commands() {
    let temp = tempdir().expect("temp dir");
    let db = temp.path().join("graph.redb");
    family(&db);

    run(&db, &["remove-edge", "homer->|married to|->marge"]).expect("remove edge");
    assert_eq!(run(&db, &["list", "labels"]).expect("labels"), json!(["son of"]));

    run(&db, &["remove-vertex", "homer"]).expect("remove vertex");
    assert_eq!(run(&db, &["list", "vertices"]).expect("vertices"), json!(["bart", "marge"]));
    let edges = run(&db, &["list", "edges"]).expect("edges");
    assert_eq!(edges.as_array().expect("array").len(), 1);

    let missing = run(&db, &["remove-vertex", "homer"]).expect_err("gone");
    assert!(matches!(missing, GraphError::InvalidArgument(_)));
}

#[test]
fn add_edge_requires_both_vertices() {
    let temp = tempdir().expect("temp dir");
    let db = temp.path().join("graph.redb");
    run(&db, &["add-vertex", "--id", "a"]).expect("vertex");

    let err = run(&db, &["add-edge", "--from", "a", "--to", "ghost", "-l", "x"]).expect_err("missing");
    assert!(matches!(err, GraphError::InvalidArgument(_)));
}

#[test]
fn config_file_selects_compression() {
    let temp = tempdir().expect("temp dir");
    let db = temp.path().join("graph.redb");
    let config = temp.path().join("docgraph.toml");
    std::fs::write(
        &config,
        format!(
            "[store]\nbackend = \"redb\"\npath = {:?}\n\n[graph]\ncompression = \"external\"\n",
            db.to_str().expect("utf-8 path")
        ),
    )
    .expect("write config");

    let cli = Cli::try_parse_from([
        "docgraph",
        "--config",
        config.to_str().expect("utf-8 path"),
        "add-vertex",
        "--id",
        "tc",
    ])
    .expect("parse");
    execute(&cli).expect("add vertex");

    let shown = run(&db, &["show", "--vertex", "tc"]);
    // Opened with default settings the packed form cannot be decoded inline.
    assert!(shown.is_err());

    let cli = Cli::try_parse_from([
        "docgraph",
        "--config",
        config.to_str().expect("utf-8 path"),
        "show",
        "--vertex",
        "tc",
    ])
    .expect("parse");
    assert_eq!(execute(&cli).expect("show")["edges"], json!("al_tc"));
}
