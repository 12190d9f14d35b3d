//! Config file example.
//!
//! Writes a YAML dispatcher config to a temporary directory, loads it with
//! `command-signature-config`, and dispatches against the result.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p command-signature-demos --example config_file
//! ```

use command_signature_config::{DispatchConfig, build_dispatcher};

const CONFIG: &str = r#"
settings:
  fallback: raise
  truthy: ["true", "yes", "on", "1"]
  falsy: ["false", "no", "off", "0"]
types:
  - symbol: version
    pattern: "^v([0-9]+\\.[0-9]+\\.[0-9]+)$"
commands:
  - name: deploy
    signatures:
      - "(str) service (version) release [--dry-run] [(int) --replicas]"
      - "(str) service --rollback"
    aliases: { replicas: [r], dry-run: [n] }
    descriptions:
      service: "Service to deploy"
      release: "Release tag, e.g. v1.2.3"
  - name: scale
    signatures: ["(str) service (int) replicas"]
    settings: { fallback: ignore }
"#;

fn main() {
    let dir = std::env::temp_dir().join("command_signature_example_config");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("commands.yml");
    std::fs::write(&path, CONFIG).unwrap();

    let config = DispatchConfig::load(&path).unwrap();
    let dispatcher = build_dispatcher(&config).unwrap();
    println!(
        "Loaded {} command(s) and {} custom type(s) from {}",
        dispatcher.commands().len(),
        dispatcher.types().len(),
        path.display()
    );

    let calls = [
        ("deploy", "api v2.4.1 --r=3 -n"),
        ("deploy", "api v2.4.1 --r=3 --n"),
        ("deploy", "api --rollback"),
        ("scale", "api many"),
    ];
    for (command, input) in calls {
        print!("{command} {input} -> ");
        match dispatcher.dispatch(command, input) {
            Ok(Some(binding)) => println!("{}", serde_json::to_string(binding.values()).unwrap()),
            Ok(None) => println!("ignored"),
            Err(err) => println!("error: {err}"),
        }
    }

    // Save as JSON next to the YAML file.
    let json_path = dir.join("commands.json");
    config.save(&json_path).unwrap();
    println!("Saved JSON copy to {}", json_path.display());

    std::fs::remove_dir_all(&dir).ok();
}
