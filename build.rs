fn main() {
    // ESP-IDF environment is only needed when building the firmware; host
    // builds and tests skip it. Covers both the Xtensa and RISC-V chips.
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os == "espidf" {
        embuild::espidf::sysenv::output();
    }
}
