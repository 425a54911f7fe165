//! Level loader: constructs a typed record in an arena and reads a file
//! into a raw block allocated beside it.
//!
//! Demonstrates:
//!   1. Creating a fixed-capacity arena
//!   2. `construct` / `destroy` for a typed value with a destructor
//!   3. `allocate` / `release` for raw bytes
//!   4. Reading the block layout back out
//!
//! Run with:
//!   cargo run --example level_loader -- [path]
//!
//! Set `RUST_LOG=blockarena=trace` to see every allocation and release.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use blockarena::{BlockArena, BlockHandle};
use tracing_subscriber::EnvFilter;

const ARENA_CAPACITY: usize = 2048;

struct LevelData {
    name: String,
    contents: Option<BlockHandle>,
    size: usize,
}

impl LevelData {
    fn new(name: &str) -> Self {
        println!("Creating level data...");
        Self {
            name: name.to_string(),
            contents: None,
            size: 0,
        }
    }
}

impl Drop for LevelData {
    fn drop(&mut self) {
        println!("Destroying level data...");
    }
}

fn load_into(
    arena: &mut BlockArena,
    path: &Path,
) -> Result<(BlockHandle, usize), Box<dyn std::error::Error>> {
    let mut file = File::open(path)?;
    let size = usize::try_from(file.metadata()?.len())?;
    // One extra byte for a trailing NUL, as a C consumer would expect.
    let handle = arena.allocate(size + 1)?;
    if let Some(buf) = arena.bytes_mut(&handle) {
        if let Err(e) = file.read_exact(&mut buf[..size]) {
            arena.release(handle);
            return Err(e.into());
        }
        buf[size] = 0;
    }
    Ok((handle, size))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("demo for blockarena version: {}", blockarena::VERSION);

    let path: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("Cargo.toml"));

    let mut arena = BlockArena::new(ARENA_CAPACITY)?;
    let level = arena.construct_with(|| LevelData::new("My Level"))?;

    match load_into(&mut arena, &path) {
        Ok((handle, size)) => {
            if let Some(data) = arena.get_mut(&level) {
                data.contents = Some(handle);
                data.size = size;
                println!(
                    "Level file \"{}\" opened and read. Length: {}",
                    data.name, data.size
                );
            }
        }
        Err(e) => eprintln!("Couldn't open level file {}: {e}", path.display()),
    }

    println!("Arena: {}", arena.stats());
    for block in arena.blocks() {
        println!(
            "  @{:>5}  {:>5} bytes  {}",
            block.offset,
            block.size,
            if block.is_free { "free" } else { "used" }
        );
    }

    // Raw blocks are returned with `release`; no destructor runs.
    let contents = arena.get_mut(&level).and_then(|data| data.contents.take());
    arena.release(contents);

    // Typed values are returned with `destroy`, which runs `Drop`.
    arena.destroy(level);

    println!("Arena after cleanup: {}", arena.stats());
    Ok(())
}
