use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use splitpack_core::VERSION;

#[derive(Serialize)]
struct VersionJson {
    name: &'static str,
    version: &'static str,
}

pub fn run(json: bool) -> Result<()> {
    if json {
        let out = VersionJson {
            name: "splitpack",
            version: VERSION,
        };
        println!("{}", serde_json::to_string(&out).into_diagnostic()?);
    } else {
        println!("splitpack {VERSION}");
    }
    Ok(())
}
