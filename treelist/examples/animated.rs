//! Headless walkthrough of the tree-to-list engine.
//!
//! Builds a small file tree, mutates it while "displayed", and prints the
//! flat projection after each step together with the driver calls the
//! mutations produced. A real front end would implement [`ListDriver`] on
//! top of its animated list; here a recording driver stands in.

use std::fs::File;
use std::time::Instant;

use simplelog::{Config, LevelFilter, WriteLogger};
use treelist::{
    DriverCall, NodeSpec, RecordingDriver, SCROLL_DELAY, TreeList, TreeListConfig,
};

fn dir(key: &str) -> NodeSpec<String> {
    NodeSpec::new(key, format!("{key}/"))
}

fn file(key: &str) -> NodeSpec<String> {
    NodeSpec::new(key, key.to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log_file = File::create("animated.log")?;
    WriteLogger::init(LevelFilter::Trace, Config::default(), log_file)
        .expect("Failed to initialize logger");

    let config = TreeListConfig::new().indent_width(2);
    let driver = RecordingDriver::new();
    let mut list = TreeList::new(Box::new(driver.clone()));
    let root = list.root();

    let src = list.add_children(
        root,
        vec![
            dir("src")
                .child(file("main.rs"))
                .child(file("lib.rs")),
            dir("tests").child(file("integration.rs")),
            file("Cargo.toml"),
        ],
    )?[0];
    print_step(&list, &driver, &config, "initial add");

    list.expand(src)?;
    print_step(&list, &driver, &config, "expand src/");

    list.insert_children(src, 1, vec![file("error.rs")])?;
    print_step(&list, &driver, &config, "insert src/error.rs");

    list.remove_children(root, &["tests"])?;
    print_step(&list, &driver, &config, "remove tests/");

    // The deferred scroll fires once its delay has elapsed.
    list.poll_scroll_at(Instant::now() + SCROLL_DELAY);
    print_step(&list, &driver, &config, "poll deferred scroll");

    list.dispose();
    Ok(())
}

fn print_step(
    list: &TreeList<String>,
    driver: &RecordingDriver<String>,
    config: &TreeListConfig,
    label: &str,
) {
    println!("== {label}");
    for call in driver.take() {
        match call {
            DriverCall::Insert(index) => println!("   driver: insert_at({index})"),
            DriverCall::Remove { index, row } => {
                println!("   driver: remove_at({index}) exiting {:?}", row.value)
            }
            DriverCall::Scroll(index) => println!("   driver: scroll_to({index})"),
            DriverCall::Refresh(index) => println!("   driver: refresh_at({index})"),
        }
    }
    for index in 0..list.len() {
        let row = list.row(index).expect("row in range");
        let snapshot = list.row_snapshot(index).expect("row in range");
        let has_children = !list
            .tree()
            .children_of(row.id)
            .expect("attached")
            .is_empty();
        let expanded = list.tree().is_expanded(row.id);
        println!(
            "   {:>2} {:indent$}{}{}",
            index,
            "",
            config.toggle_icon(has_children, expanded),
            snapshot.value,
            indent = snapshot.indentation(config) as usize,
        );
    }
    println!();
}
