use std::env;
use std::fs;
use std::path::Path;

fn main() {
    // Drop a limits template next to the target directory
    let out_dir = env::var("OUT_DIR").unwrap_or_else(|_| "./".to_string());
    let template_path = Path::new(&out_dir).join("../../../nalkit.template.toml");

    let template = r#"# nalkit configuration template
# Copy this file to 'nalkit.toml' to override the parser limits.
# NALKIT_MAX_* environment variables take effect before this file.

# Largest SEI payload accepted, in bytes
max_sei_payload_size = 1048576

# Largest number of SEI messages per NAL unit
max_sei_messages = 256

# Cap on reference list modification and memory management operations
max_marking_operations = 1024
"#;

    let _ = fs::write(template_path, template);
    println!("cargo:rerun-if-changed=build.rs");
}
