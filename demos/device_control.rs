/**
 * Device Control Example
 *
 * Queries a plug, switches it, then toggles it back.
 * Run with RUST_LOG=debug to see the frames on the wire.
 */
use tokio::time::{Duration, sleep};
use tuya31::DeviceBuilder;

#[tokio::main]
async fn main() {
    env_logger::init();
    println!("--- tuya31 - Device Control ---");

    // 1. Initialize Device
    let id = "eb5176f91956a97b165dc5";
    let key = "FGhe;!?GLh$vv9<c";
    let device = match DeviceBuilder::new(id, key).host("192.168.1.20").build() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("[ERROR] Invalid device configuration: {}", e);
            return;
        }
    };

    // 2. Query status
    println!("[STEP 1] Querying current state...");
    match device.get().await {
        Ok(state) => println!("[SUCCESS] Device is {:?}", state),
        Err(e) => eprintln!("[ERROR] Status query failed: {} (code {})", e, e.code()),
    }

    // 3. Switch ON
    println!("[STEP 2] Switching ON...");
    if let Err(e) = device.set(true).await {
        eprintln!("[ERROR] Control failed: {}", e);
    }

    sleep(Duration::from_secs(1)).await;

    // 4. Toggle back using the cached state
    println!("[STEP 3] Toggling...");
    match device.toggle().await {
        Ok(()) => println!("[SUCCESS] Device is now {:?}", device.state()),
        Err(e) => eprintln!("[ERROR] Toggle failed: {}", e),
    }

    println!("[INFO] Example finished (last error code: {}).", device.error_code());
}
