use std::{env, path::PathBuf};

use anyhow::Result;
use fs_extra::{copy_items, dir::CopyOptions};

// Bundle ./assets with the build output so native runs find the room model
// outside the repository checkout as well.
fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets = manifest_dir.join("assets");
    if !assets.exists() {
        println!("cargo:warning=no assets/ directory, the room model has to be provided at runtime");
        return Ok(());
    }

    let out_dir = env::var("OUT_DIR")?;
    let options = CopyOptions {
        overwrite: true,
        ..CopyOptions::new()
    };
    copy_items(&[assets], out_dir, &options)?;
    Ok(())
}
