use dotenvy::dotenv;
use std::env::var;

fn main() {
    dotenv().ok();

    println!("cargo:rustc-check-cfg=cfg(no_connection)");
    println!("cargo:rerun-if-env-changed=PROJECT_CONNECTION_STRING");

    if var("PROJECT_CONNECTION_STRING").is_err() {
        println!("cargo:rustc-cfg=no_connection");
    }
}
