use std::{env, fs::File, io::Write, path::Path};

use chrono::Utc;
use cmd_lib::run_fun;

fn get_build_time() -> String {
    let utc = Utc::now();
    utc.format("%F %X %z").to_string()
}

fn get_git_commit_id() -> String {
    run_fun!(git rev-parse --short HEAD).unwrap_or_else(|_| "unknown".into())
}

fn get_git_describe() -> String {
    run_fun!(git describe --tags --always --dirty="-dev").unwrap_or_else(|_| "unknown".into())
}

fn get_version() -> String {
    env::var("CARGO_PKG_VERSION").expect("Failed to get CARGO_PKG_VERSION")
}

fn main() {
    add_const("BUILD_TIME", get_build_time);
    add_const("GIT_COMMIT_ID", get_git_commit_id);
    add_const("GIT_DESCRIBE", get_git_describe);
    add_const("VERSION", get_version);
    println!("cargo:rerun-if-changed=build.rs");
}

fn add_const(file_name: &'static str, value: fn() -> String) {
    let out_dir_path = env::var("OUT_DIR").expect("Failed to get OUT_DIR");
    let out_dir = Path::new(&out_dir_path);
    write_to(&out_dir.join(file_name), value().trim().as_bytes());
}

fn write_to(path: &Path, bytes: &[u8]) {
    let mut f = File::create(path).expect("Failed to create file");
    f.write_all(bytes).expect("Failed to write file");
}
