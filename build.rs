use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Host builds (unit tests, simulation) need no linker setup.
    let target = env::var("TARGET").unwrap_or_default();
    if !target.contains("avr") {
        return;
    }

    println!("cargo:rustc-link-arg=-mmcu=atmega128");

    if env::var("CARGO_FEATURE_ATMEGA128").is_err() {
        println!("cargo:warning=building for AVR without the `atmega128` feature: no register-level HAL");
    }
}
