use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;

// Prints a fresh 256-bit signing key for session tokens
fn main() {
    let mut key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);

    let base64_key = STANDARD.encode(key);

    println!("AI To-Do session signing key");
    println!();
    println!("Base64: {}", base64_key);
    println!("Hex:    {}", hex::encode(key));
    println!();
    println!("Add this line to your .env file:");
    println!("JWT_SECRET={}", base64_key);
}
