use proto_array::fork_choice_test_definition::*;
use serde::Serialize;
use slog::{error, info, o, Drain, Logger};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process;

fn main() {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let log = Logger::root(drain, o!());

    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    if let Err(e) = write_all(&out_dir, &log) {
        error!(log, "Failed to write fork choice test definitions"; "error" => e);
        // Flush the async drain before exiting.
        drop(log);
        process::exit(1);
    }
}

fn write_all(out_dir: &Path, log: &Logger) -> Result<(), String> {
    fs::create_dir_all(out_dir)
        .map_err(|e| format!("Unable to create {:?}: {:?}", out_dir, e))?;

    let definitions = [
        ("votes.yaml", get_votes_test_definition()),
        ("no_votes.yaml", get_no_votes_test_definition()),
        ("ffg_01.yaml", get_ffg_case_01_test_definition()),
        ("ffg_02.yaml", get_ffg_case_02_test_definition()),
        ("proposer_weighting.yaml", get_proposer_weighting_test_definition()),
        ("pruning.yaml", get_pruning_test_definition()),
    ];

    for (filename, definition) in definitions.iter() {
        let path = out_dir.join(filename);
        write_test_def_to_yaml(&path, definition)?;
        info!(
            log,
            "Wrote fork choice test definition";
            "path" => %path.display(),
            "operations" => definition.operations.len(),
        );
    }

    Ok(())
}

fn write_test_def_to_yaml<T: Serialize>(path: &Path, def: &T) -> Result<(), String> {
    let file = File::create(path).map_err(|e| format!("Unable to create {:?}: {:?}", path, e))?;
    serde_yaml::to_writer(file, def).map_err(|e| format!("Unable to write {:?}: {:?}", path, e))
}
