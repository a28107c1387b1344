//! Creates a signing key for vault deposits and withdrawals.
//!
//! Run with: cargo run --bin generate-wallet

use alloy_signer_local::PrivateKeySigner;

fn main() {
    let signer = PrivateKeySigner::random();
    let private_key = format!("0x{}", hex::encode(signer.credential().to_bytes()));

    println!("\n🔑 vaultkeeper signing key\n");
    println!("   EVM address: {:?}", signer.address());
    println!("   Key:         {}\n", private_key);

    println!("Add it to .env:\n");
    println!("   WALLET_PRIVATE_KEY={}", private_key);
    println!("   VAULTKEEPER_NETWORK=testnet\n");

    println!("⚠️  This key can move every vault share and token the address holds.");
    println!("   Keep .env out of version control.\n");
    println!("Next steps:");
    println!("   1. Send HBAR to the EVM address. The transfer creates the Hedera account.");
    println!("   2. Run `cargo run --bin diagnose` to check the relay sees the right chain.");
    println!("   3. Try `vaultkeeper deposit` on testnet before mainnet.");
}
