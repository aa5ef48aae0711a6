//! Puts `memory.x` where the linker can find it.

use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
	let out = &PathBuf::from(env::var_os("OUT_DIR").expect("OUT_DIR not set"));
	fs::copy("memory.x", out.join("memory.x")).expect("could not copy memory.x");
	println!("cargo:rustc-link-search={}", out.display());
	println!("cargo:rerun-if-changed=memory.x");
	println!("cargo:rerun-if-changed=build.rs");
}
