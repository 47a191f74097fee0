use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Whether clients connect to the blog over https.
    /// If so, the session cookie is sent as a secure cookie.
    #[arg(short, long)]
    secure: bool,

    /// The address to listen on. By default the blog
    /// listens just on the IPv4 loopback.
    #[arg(short, long)]
    address: Option<String>,

    /// The port to listen on.
    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// Directory holding the database, `blog.db`.
    #[arg(short, long, default_value = ".")]
    data_dir: PathBuf,

    /// Secret used to sign session cookies, at least 32 bytes.
    /// Without one, a random key is used and logins end when the server restarts.
    #[arg(long, env = "INKPOT_SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// Username created on first run, when there are no users.
    #[arg(long, default_value = "admin")]
    admin_user: String,

    /// Password for `--admin-user`, only used on first run.
    #[arg(long, env = "INKPOT_ADMIN_PASSWORD", hide_env_values = true, default_value = "password")]
    admin_password: String,
}

impl Args {
    pub fn addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.address
            .as_deref()
            .unwrap_or("127.0.0.1")
            .parse()
            .map(|addr: IpAddr| (addr, self.port).into())
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn secret_key(&self) -> Option<&str> {
        self.secret_key.as_deref()
    }

    pub fn admin(&self) -> (&str, &str) {
        (&self.admin_user, &self.admin_password)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["inkpot"]).unwrap();

        assert_eq!(args.addr().unwrap(), "127.0.0.1:5000".parse().unwrap());
        assert!(!args.secure());
        assert_eq!(args.data_dir(), Path::new("."));
        assert_eq!(args.admin().0, "admin");
    }

    #[test]
    fn address_and_port() {
        let args = Args::try_parse_from(["inkpot", "-a", "::", "-p", "8080", "--secure"]).unwrap();

        assert_eq!(args.addr().unwrap(), "[::]:8080".parse().unwrap());
        assert!(args.secure());

        let args = Args::try_parse_from(["inkpot", "-a", "not an ip"]).unwrap();
        assert!(args.addr().is_err());
    }
}
