//! gemview binary - resolves CLI arguments and boots the viewer.

use std::path::PathBuf;

use gemview::viewer;

fn main() -> anyhow::Result<()> {
    let mut assets_dir: Option<PathBuf> = None;
    let mut mesh_path: Option<PathBuf> = None;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            _ => {
                let path = PathBuf::from(&arg);
                if path.is_dir() {
                    assets_dir = Some(path);
                } else {
                    mesh_path = Some(path);
                }
            }
        }
    }

    viewer::run(assets_dir, mesh_path)
}

fn print_usage() {
    println!("gemview - interactive refraction viewer");
    println!();
    println!("Usage: gemview [assets-dir | mesh.glb]");
    println!();
    println!("  assets-dir   directory with *.hdr/*.exr, cube faces and a gem mesh");
    println!("  mesh.glb     explicit gem mesh (.glb or .gltf)");
    println!();
    println!("With no arguments ./assets is used when present; missing pieces");
    println!("fall back to a procedural gem and a gradient sky.");
}
