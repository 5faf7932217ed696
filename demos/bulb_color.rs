/**
 * Bulb Colour Example (Sync)
 *
 * Cycles a colour bulb through red, green and blue, then back to warm white,
 * using the blocking API.
 */
use std::thread::sleep;
use std::time::Duration;
use tuya31::sync::Device;
use tuya31::{DeviceBuilder, DeviceKind};

fn main() {
    env_logger::init();
    println!("--- tuya31 - Bulb Colour (Sync) ---");

    let builder = DeviceBuilder::new("eb0123456789abcdef0123", "0123456789abcdef")
        .host("192.168.1.21")
        .kind(DeviceKind::Bulb)
        .retries(2);
    let device = match Device::from_builder(builder) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("[ERROR] Invalid device configuration: {}", e);
            return;
        }
    };
    let Some(bulb) = device.as_bulb() else {
        return;
    };

    for (name, (r, g, b)) in [("red", (255, 0, 0)), ("green", (0, 255, 0)), ("blue", (0, 0, 255))] {
        println!("[STEP] Setting {}...", name);
        if let Err(e) = bulb.set_color_rgb(r, g, b) {
            eprintln!("[ERROR] {}: {}", name, e);
        }
        sleep(Duration::from_secs(2));
    }

    println!("[STEP] Back to white...");
    if let Err(e) = bulb.set_white(255, 0) {
        eprintln!("[ERROR] white: {}", e);
    }
}
