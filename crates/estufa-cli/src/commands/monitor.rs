use estufa_core::EstufaClient;

use super::Overrides;

pub fn run(overrides: Overrides) {
    let config = super::load_config(overrides);
    let client = EstufaClient::from_config(&config);
    let mut app = crate::tui::app::App::new(client, config);
    if let Err(e) = app.run() {
        eprintln!("TUI error: {e}");
        std::process::exit(1);
    }
}
