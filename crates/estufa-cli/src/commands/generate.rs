use estufa_core::{PayloadShape, SyntheticGenerator, SystemClock};

pub fn run(seed: Option<u64>, shape: &str) {
    let generator = match seed {
        Some(seed) => SyntheticGenerator::seeded(seed),
        None => SyntheticGenerator::new(),
    };
    // clap restricts the accepted values
    let shape = PayloadShape::parse(shape).unwrap_or_default();
    let body = shape.encode(&generator.generate(&SystemClock));
    match serde_json::to_string_pretty(&body) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
