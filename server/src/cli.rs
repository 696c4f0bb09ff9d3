use std::path::PathBuf;

use clap::Parser;

/// Environment variable for the server host
pub const ENV_HOST: &str = "LATCHKEY_HOST";

/// Environment variable for the server port
pub const ENV_PORT: &str = "LATCHKEY_PORT";

/// Environment variable for the expected audience claim
pub const ENV_AUDIENCE: &str = "LATCHKEY_AUDIENCE";

/// Environment variable for the private key path
pub const ENV_PRIVATE_KEY: &str = "LATCHKEY_PRIVATE_KEY";

/// Environment variable for the public key path
pub const ENV_PUBLIC_KEY: &str = "LATCHKEY_PUBLIC_KEY";

/// Environment variable for the log level/filter
pub const ENV_LOG: &str = "LATCHKEY_LOG";

#[derive(Parser)]
#[command(name = "latchkey")]
#[command(version, about = "Level-gated token authentication demo", long_about = None)]
pub struct Cli {
    /// Server host address
    #[arg(long, short = 'H', env = ENV_HOST, default_value = "127.0.0.1")]
    pub host: String,

    /// Server port
    #[arg(long, short = 'p', env = ENV_PORT, default_value_t = 8000)]
    pub port: u16,

    /// Audience the issued and accepted tokens are scoped to
    #[arg(long, env = ENV_AUDIENCE, default_value = "app.example.com")]
    pub audience: String,

    /// Path to the RSA private key PEM (see the README for generating one)
    #[arg(long, env = ENV_PRIVATE_KEY, default_value = "latchkey.pem")]
    pub private_key: PathBuf,

    /// Path to the RSA public key PEM
    #[arg(long, env = ENV_PUBLIC_KEY, default_value = "latchkey.pub.pem")]
    pub public_key: PathBuf,
}
