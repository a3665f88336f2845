//! Print the Argon2id hash of a password, for seeding user records by hand.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "hash-password", about = "Hash a password for a user record")]
struct Args {
    /// Plaintext password to hash.
    password: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let hash = petstore_auth::hash_password(&args.password)?;
    println!("{hash}");
    Ok(())
}
