//! Golden end-to-end tests.
//!
//! Every `testdata/polish-*.go` file runs through the full default
//! pipeline. A sibling `.out` file holds the expected rewritten text; when
//! no `.out` exists, the input must already be a fixpoint and come back
//! byte-identical.

use std::fs;
use std::path::{Path, PathBuf};

use burnish_core::{default_pipeline, diff, Context};

#[test]
fn golden() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata");
    let mut inputs: Vec<PathBuf> = fs::read_dir(&dir)
        .expect("reading testdata")
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
            name.starts_with("polish-") && name.ends_with(".go")
        })
        .collect();
    inputs.sort();
    assert!(!inputs.is_empty(), "no testdata matched polish-*.go");

    let mut failures = Vec::new();
    for file in inputs {
        let pipeline = default_pipeline();
        let mut ctxt = Context::new();
        let Some(pkg) = pipeline.run_files(&mut ctxt, std::slice::from_ref(&file)) else {
            failures.push(format!("{}: pipeline failed", file.display()));
            continue;
        };
        if ctxt.errors {
            failures.push(format!("{}: pipeline reported errors", file.display()));
            continue;
        }

        let out_path = PathBuf::from(format!("{}.out", file.display()));
        match fs::read_to_string(&out_path) {
            Ok(want) => {
                let have = pkg.src(&file);
                if have != want {
                    failures.push(format!(
                        "{}: incorrect output\n{}",
                        file.display(),
                        diff::unified("want", &want, have)
                    ));
                }
            }
            Err(_) => {
                if pkg.modified(&file) {
                    failures.push(format!(
                        "{}: should not modify, but made changes:\n{}",
                        file.display(),
                        diff::unified("orig", pkg.orig_src(&file), pkg.src(&file))
                    ));
                }
            }
        }
    }

    if !failures.is_empty() {
        panic!("{}", failures.join("\n\n"));
    }
}
