use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let out_dir = env::var("OUT_DIR").unwrap();

    // Re-run if units.csv changes
    println!("cargo:rerun-if-changed=units.csv");

    let units = parse_units_csv(&crate_dir);
    generate_builtin_table(&units, &out_dir);
}

#[derive(Debug, Clone)]
struct UnitDef {
    name: String,
    symbol: String,
    aliases: Vec<String>,
    definition: Option<String>,
}

fn parse_units_csv(crate_dir: &str) -> Vec<UnitDef> {
    let csv_path = PathBuf::from(crate_dir).join("units.csv");
    let content = fs::read_to_string(&csv_path).expect("Failed to read units.csv");

    let mut units = Vec::new();

    for line in content.lines() {
        let line = line.trim();

        // Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            println!("cargo:warning=Skipping invalid line in units.csv: {}", line);
            continue;
        }

        units.push(UnitDef {
            name: parts[0].to_string(),
            symbol: parts[1].to_string(),
            aliases: parts[2]
                .split('|')
                .map(str::trim)
                .filter(|alias| !alias.is_empty())
                .map(str::to_string)
                .collect(),
            definition: Some(parts[3])
                .filter(|definition| !definition.is_empty())
                .map(str::to_string),
        });
    }

    units
}

fn generate_builtin_table(units: &[UnitDef], out_dir: &str) {
    let mut code = String::from("// Auto-generated from units.csv\n");
    code.push_str("&[\n");

    for unit in units {
        code.push_str("    BuiltinUnit {\n");
        code.push_str(&format!("        name: {:?},\n", unit.name));
        code.push_str(&format!("        symbol: {:?},\n", unit.symbol));
        code.push_str(&format!("        aliases: &{:?},\n", unit.aliases));
        match &unit.definition {
            Some(definition) => {
                code.push_str(&format!("        definition: Some({:?}),\n", definition))
            }
            None => code.push_str("        definition: None,\n"),
        }
        code.push_str("    },\n");
    }

    code.push_str("]\n");

    let dest_path = PathBuf::from(out_dir).join("builtin_units.rs");
    fs::write(&dest_path, code).expect("Failed to write builtin_units.rs");
}
