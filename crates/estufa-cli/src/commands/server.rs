use estufa_core::SyntheticGenerator;

pub fn run(host: &str, port: u16, seed: Option<u64>) {
    let generator = match seed {
        Some(seed) => SyntheticGenerator::seeded(seed),
        None => SyntheticGenerator::new(),
    };

    let base = format!("http://{host}:{port}");

    println!("🌱 Estufa Mock Backend v{}", estufa_core::VERSION);
    println!("   {base}");
    match seed {
        Some(seed) => println!("   seed {seed} (identical readings per request)"),
        None => println!("   fresh synthetic readings per request"),
    }
    println!();
    println!("   Endpoints:");
    println!("     GET /               API index (try: curl {base})");
    println!("     GET /api/estufas    Installations, sensors and processes");
    println!("     GET /health         Health check");
    println!();
    println!("   Query params for /api/estufas:");
    println!("     shape=array|wrapped|single   Response shape (default: array)");
    println!();
    println!("   Point the dashboard at it:");
    println!("     estufa monitor --api-url {base}");
    println!();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: cannot start runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(estufa_server::run_server(host, port, generator)) {
        eprintln!("Error: server on {base} failed: {e}");
        std::process::exit(1);
    }
}
