//! Startup banner

use super::constants::APP_NAME;

pub fn print_banner(host: &str, port: u16, store_backend: &str, data_dir: &str) {
    let version = env!("CARGO_PKG_VERSION");

    println!();
    println!("  {APP_NAME} v{version}");
    println!("  ──────────────────────────────────────────");
    println!("  API        http://{host}:{port}/api/v1");
    println!("  Live feed  ws://{host}:{port}/ws");
    println!("  Store      {store_backend}");
    println!("  Data dir   {data_dir}");
    println!();
}
